use super::Visit;
use hcl::{
    template::{Directive, Element},
    Expression, ObjectKey, Operation, Template, Traversal, TraversalOperator,
};

/// Recursively visit all [hcl::Traversal]s
pub trait VisitTraversals {
    fn visit_traversals(&self, visitor: &mut dyn Visit<Traversal>);
}

impl VisitTraversals for Expression {
    fn visit_traversals(&self, visitor: &mut dyn Visit<Traversal>) {
        match self {
            Expression::Variable(variable) => {
                // a standalone variable is a traversal with no operators...kind of
                let traversal = Traversal::new(
                    Expression::Variable(variable.clone()),
                    Vec::<TraversalOperator>::new(),
                );
                visitor.visit(&traversal);
            }
            Expression::Traversal(traversal) => {
                visitor.visit(traversal);
                if !matches!(traversal.expr, Expression::Variable(_)) {
                    traversal.expr.visit_traversals(visitor);
                }
                for operator in &traversal.operators {
                    if let TraversalOperator::Index(index) = operator {
                        index.visit_traversals(visitor);
                    }
                }
            }
            Expression::Array(array) => {
                for expr in array {
                    expr.visit_traversals(visitor);
                }
            }
            Expression::Object(object) => {
                for (key, value) in object {
                    if let ObjectKey::Expression(key) = key {
                        key.visit_traversals(visitor);
                    }
                    value.visit_traversals(visitor);
                }
            }
            Expression::TemplateExpr(template_expr) => {
                if let Ok(template) = Template::from_expr(template_expr) {
                    template.visit_traversals(visitor);
                }
            }
            Expression::FuncCall(func_call) => {
                for arg in &func_call.args {
                    arg.visit_traversals(visitor);
                }
            }
            Expression::Parenthesis(expr) => {
                expr.visit_traversals(visitor);
            }
            Expression::Conditional(cond) => {
                cond.cond_expr.visit_traversals(visitor);
                cond.true_expr.visit_traversals(visitor);
                cond.false_expr.visit_traversals(visitor);
            }
            Expression::Operation(operation) => match &**operation {
                Operation::Binary(binop) => {
                    binop.lhs_expr.visit_traversals(visitor);
                    binop.rhs_expr.visit_traversals(visitor);
                }
                Operation::Unary(unop) => {
                    unop.expr.visit_traversals(visitor);
                }
            },
            Expression::ForExpr(forexpr) => {
                forexpr.collection_expr.visit_traversals(visitor);
                forexpr
                    .key_expr
                    .iter()
                    .for_each(|e| e.visit_traversals(visitor));
                forexpr.value_expr.visit_traversals(visitor);
                forexpr
                    .cond_expr
                    .iter()
                    .for_each(|e| e.visit_traversals(visitor));
            }
            _ => {}
        }
    }
}

impl VisitTraversals for Template {
    fn visit_traversals(&self, visitor: &mut dyn Visit<Traversal>) {
        for element in self.elements() {
            match element {
                Element::Interpolation(interpolation) => {
                    interpolation.expr.visit_traversals(visitor);
                }
                Element::Directive(directive) => match directive {
                    Directive::If(ifdir) => {
                        ifdir.cond_expr.visit_traversals(visitor);
                        ifdir.true_template.visit_traversals(visitor);
                        ifdir
                            .false_template
                            .iter()
                            .for_each(|t| t.visit_traversals(visitor));
                    }
                    Directive::For(fordir) => {
                        fordir.collection_expr.visit_traversals(visitor);
                        fordir.template.visit_traversals(visitor);
                    }
                },
                Element::Literal(_) => {}
            }
        }
    }
}
