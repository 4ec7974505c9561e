//! Depth-first tree traversal with enter/exit callbacks.
//!
//!     The walk is iterative; listener recursion depth never tracks tree
//!     depth, so pathological nesting cannot overflow the stack.

use super::{NodeId, NodeKind, ParseTree};
use crate::grammar::RuleId;
use crate::token::Token;

/// Callbacks fired during a depth-first walk. All methods default to no-ops
/// so listeners implement only what they care about.
pub trait ParseListener {
    fn enter_rule(&mut self, _tree: &ParseTree, _node: NodeId, _rule: RuleId) {}
    fn exit_rule(&mut self, _tree: &ParseTree, _node: NodeId, _rule: RuleId) {}
    fn visit_token(&mut self, _tree: &ParseTree, _node: NodeId, _token: &Token) {}
    /// Fired for error leaves (deleted, unexpected or inserted tokens).
    fn visit_error(&mut self, _tree: &ParseTree, _node: NodeId) {}
}

enum Step {
    Enter(NodeId),
    Exit(NodeId, RuleId),
}

/// Walk `tree` depth-first from the root, firing `enter_rule` before a rule's
/// children and `exit_rule` after them.
pub fn walk<L: ParseListener>(tree: &ParseTree, listener: &mut L) {
    let mut stack = vec![Step::Enter(tree.root())];
    while let Some(step) = stack.pop() {
        match step {
            Step::Exit(node, rule) => listener.exit_rule(tree, node, rule),
            Step::Enter(node) => match &tree.node(node).kind {
                NodeKind::Rule(rule) => {
                    listener.enter_rule(tree, node, *rule);
                    stack.push(Step::Exit(node, *rule));
                    for &child in tree.node(node).children.iter().rev() {
                        stack.push(Step::Enter(child));
                    }
                }
                NodeKind::Token { token } => {
                    listener.visit_token(tree, node, &tree.tokens()[*token]);
                }
                NodeKind::Error { .. } => listener.visit_error(tree, node),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::RuleId;
    use crate::token::{Channel, TokenType};
    use crate::tree::TreeBuilder;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl ParseListener for Recorder {
        fn enter_rule(&mut self, _tree: &ParseTree, _node: NodeId, rule: RuleId) {
            self.events.push(format!("enter:{}", rule.0));
        }
        fn exit_rule(&mut self, _tree: &ParseTree, _node: NodeId, rule: RuleId) {
            self.events.push(format!("exit:{}", rule.0));
        }
        fn visit_token(&mut self, _tree: &ParseTree, _node: NodeId, token: &Token) {
            self.events.push(format!("token:{}", token.text));
        }
    }

    #[test]
    fn test_enter_exit_bracket_children_in_parse_order() {
        let a = Token {
            ty: TokenType(2),
            channel: Channel::Default,
            text: "a".into(),
            start: 0,
            stop: 1,
            line: 1,
            column: 1,
            index: 0,
        };
        let mut builder = TreeBuilder::new();
        builder.open_rule(RuleId(0), 0);
        builder.open_rule(RuleId(1), 0);
        builder.add_token(0, &a);
        builder.close_rule();
        builder.close_rule();
        let tree = builder.finish(vec![a]);

        let mut recorder = Recorder::default();
        walk(&tree, &mut recorder);
        assert_eq!(
            recorder.events,
            vec!["enter:0", "enter:1", "token:a", "exit:1", "exit:0"]
        );
    }
}
