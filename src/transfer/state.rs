//! Transfer Phase Definitions
//!
//! Phases one transfer passes through inside the coordinator. Nothing here is
//! persisted; the phase trail exists for logging and for tests that assert
//! where a transfer stopped.

use std::fmt;

/// Transfer phases
///
/// ```text
/// INITIATED → VALIDATED → SOURCE_READ → BALANCE_CHECKED → DEST_READ
///     → BALANCES_COMPUTED → PERSISTED → COMMITTED
///
/// any non-terminal phase → ABORTED
/// ```
///
/// Terminal phases: COMMITTED, ABORTED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferPhase {
    /// Request received
    Initiated,

    /// Amount and endpoints checked, no I/O performed yet
    Validated,

    /// Source read inside the serializable scope
    SourceRead,

    /// Source balance covers the amount
    BalanceChecked,

    /// Destination read inside the scope
    DestRead,

    /// New balances computed
    BalancesComputed,

    /// Both balances written and the transaction recorded (not yet committed)
    Persisted,

    /// Terminal: scope committed
    Committed,

    /// Terminal: scope rolled back (or never opened)
    Aborted,
}

impl TransferPhase {
    /// Check if this is a terminal phase (no more transitions possible)
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferPhase::Committed | TransferPhase::Aborted)
    }

    /// The only forward successor of a non-terminal phase
    pub fn next(&self) -> Option<TransferPhase> {
        match self {
            TransferPhase::Initiated => Some(TransferPhase::Validated),
            TransferPhase::Validated => Some(TransferPhase::SourceRead),
            TransferPhase::SourceRead => Some(TransferPhase::BalanceChecked),
            TransferPhase::BalanceChecked => Some(TransferPhase::DestRead),
            TransferPhase::DestRead => Some(TransferPhase::BalancesComputed),
            TransferPhase::BalancesComputed => Some(TransferPhase::Persisted),
            TransferPhase::Persisted => Some(TransferPhase::Committed),
            TransferPhase::Committed | TransferPhase::Aborted => None,
        }
    }

    pub fn can_transition_to(&self, target: TransferPhase) -> bool {
        if self.is_terminal() {
            return false;
        }
        target == TransferPhase::Aborted || self.next() == Some(target)
    }

    /// Get human-readable phase name
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferPhase::Initiated => "INITIATED",
            TransferPhase::Validated => "VALIDATED",
            TransferPhase::SourceRead => "SOURCE_READ",
            TransferPhase::BalanceChecked => "BALANCE_CHECKED",
            TransferPhase::DestRead => "DEST_READ",
            TransferPhase::BalancesComputed => "BALANCES_COMPUTED",
            TransferPhase::Persisted => "PERSISTED",
            TransferPhase::Committed => "COMMITTED",
            TransferPhase::Aborted => "ABORTED",
        }
    }
}

impl fmt::Display for TransferPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ordered record of the phases one transfer went through
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseTrail {
    phases: Vec<TransferPhase>,
}

impl Default for PhaseTrail {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseTrail {
    pub fn new() -> Self {
        Self {
            phases: vec![TransferPhase::Initiated],
        }
    }

    pub fn current(&self) -> TransferPhase {
        self.phases
            .last()
            .copied()
            .unwrap_or(TransferPhase::Initiated)
    }

    /// Record a transition. Returns false (and records nothing) if illegal.
    pub fn advance(&mut self, next: TransferPhase) -> bool {
        if !self.current().can_transition_to(next) {
            return false;
        }
        self.phases.push(next);
        true
    }

    /// Last phase reached before ABORTED, if the transfer aborted
    pub fn aborted_at(&self) -> Option<TransferPhase> {
        match self.phases.as_slice() {
            [.., before, TransferPhase::Aborted] => Some(*before),
            _ => None,
        }
    }

    pub fn phases(&self) -> &[TransferPhase] {
        &self.phases
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_phases() {
        assert!(TransferPhase::Committed.is_terminal());
        assert!(TransferPhase::Aborted.is_terminal());

        assert!(!TransferPhase::Initiated.is_terminal());
        assert!(!TransferPhase::Persisted.is_terminal());
    }

    #[test]
    fn test_happy_path_chain() {
        let mut trail = PhaseTrail::new();
        let mut phase = TransferPhase::Initiated;
        while let Some(next) = phase.next() {
            assert!(trail.advance(next));
            phase = next;
        }
        assert_eq!(trail.current(), TransferPhase::Committed);
        assert_eq!(trail.phases().len(), 8);
        assert_eq!(trail.aborted_at(), None);
    }

    #[test]
    fn test_abort_from_any_non_terminal() {
        let mut phase = TransferPhase::Initiated;
        while let Some(next) = phase.next() {
            assert!(phase.can_transition_to(TransferPhase::Aborted));
            phase = next;
        }
        assert!(!TransferPhase::Committed.can_transition_to(TransferPhase::Aborted));
        assert!(!TransferPhase::Aborted.can_transition_to(TransferPhase::Aborted));
    }

    #[test]
    fn test_illegal_transitions_rejected() {
        let mut trail = PhaseTrail::new();
        assert!(!trail.advance(TransferPhase::SourceRead));
        assert!(!trail.advance(TransferPhase::Committed));
        assert_eq!(trail.current(), TransferPhase::Initiated);

        assert!(trail.advance(TransferPhase::Aborted));
        assert!(!trail.advance(TransferPhase::Validated));
        assert_eq!(trail.aborted_at(), Some(TransferPhase::Initiated));
    }

    #[test]
    fn test_display() {
        assert_eq!(TransferPhase::BalancesComputed.to_string(), "BALANCES_COMPUTED");
        assert_eq!(TransferPhase::DestRead.to_string(), "DEST_READ");
    }
}
