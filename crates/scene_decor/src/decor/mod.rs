//! Decoration rules and the event-driven orchestrator.
//!
//! - [`rule`]: authoring ([`rule::DecorationRule`], [`rule::RuleSet`]) and compilation.
//! - [`constraint`], [`modifier`]: candidate gates and post-spawn transform mutators.
//! - [`index`]: the instance arena keyed by owning anchor.
//! - [`orchestrator`]: [`orchestrator::Decorator`], which reacts to scene events and runs the
//!   distribution, placement, constraint, spawn and modifier stages.
//! - [`events`]: typed progress events and sinks.
//! - [`seed`], [`selection`]: deterministic seeding and weighted prefab choice.
pub mod constraint;
pub mod events;
pub mod index;
pub mod modifier;
pub mod orchestrator;
pub mod rule;
pub mod seed;
pub mod selection;
