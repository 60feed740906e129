//! Atomic Transfer Engine
//!
//! Moves funds between two accounts of the same ledger as a single
//! serializable unit of work.
//!
//! # State Machine
//!
//! ```text
//! INITIATED → VALIDATED → SOURCE_READ → BALANCE_CHECKED → DEST_READ
//!     ↓           ↓            ↓               ↓              ↓
//!     └───────────┴────────────┴───── ABORTED ─┴──────────────┘
//!                                        ↑
//!        BALANCES_COMPUTED → PERSISTED ──┴──→ COMMITTED
//! ```
//!
//! # Safety Invariants
//!
//! 1. **Conservation**: a committed transfer debits and credits the same amount
//! 2. **Non-negative**: no committed balance is ever below zero
//! 3. **All-or-nothing**: an aborted transfer leaves no balance change and no record
//! 4. **Serializable scope**: every transfer runs in its own serializable scope

pub mod coordinator;
pub mod state;

pub use coordinator::{TransferCoordinator, TransferReport, TransferRequest};
pub use state::{PhaseTrail, TransferPhase};
