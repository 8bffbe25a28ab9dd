// SPDX-License-Identifier: MPL-2.0

//! Non exposed modules.

mod arena;
mod core;
mod incompatibility;
mod partial_solution;

pub(crate) use arena::{Arena, HashArena, Id};
pub(crate) use core::State;
pub(crate) use incompatibility::{IncompId, Incompatibility, PackageId, Relation};
pub(crate) use partial_solution::{DecisionLevel, PartialSolution, SatisfierSearch};
