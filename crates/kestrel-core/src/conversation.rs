//! Conversation State: the append-only history of Turns.

use kestrel_contracts::turn::Turn;

/// An ordered, append-only sequence of Turns.
///
/// The first Turn is always the system Turn holding the operating
/// instructions. Turns are never removed or reordered; the only mutation this
/// type exposes is `push`.
#[derive(Debug, Clone)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new(instructions: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn::system(instructions)],
        }
    }

    /// Append a Turn and return its index.
    pub fn push(&mut self, turn: Turn) -> usize {
        self.turns.push(turn);
        self.turns.len() - 1
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Never true: the system Turn is always present.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }
}

#[cfg(test)]
mod tests {
    use kestrel_contracts::turn::Role;

    use super::*;

    #[test]
    fn starts_with_exactly_the_system_turn() {
        let conv = Conversation::new("be helpful");
        assert_eq!(conv.len(), 1);
        assert_eq!(conv.turns()[0], Turn::system("be helpful"));
    }

    #[test]
    fn push_appends_in_order() {
        let mut conv = Conversation::new("sys");
        assert_eq!(conv.push(Turn::user("one")), 1);
        assert_eq!(conv.push(Turn::assistant("two")), 2);

        let roles: Vec<Role> = conv.turns().iter().map(Turn::role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
        assert_eq!(conv.last().map(Turn::text), Some("two".to_string()));
    }
}
