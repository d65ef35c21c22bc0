#![forbid(unsafe_code)]
//! scene_decor: Rule-based procedural decoration of scene anchors.
//!
//! Modules:
//! - mask: composable scalar fields and predicates evaluated per candidate (noise, textures, geometry)
//! - distribution: sample point generators over an anchor's footprint (grid, random, simplex, staggered)
//! - scene: collaborator traits for the scene graph, raycasts and instance pools, plus in-memory versions
//! - placement: ray construction, nearest-hit resolution and candidate assembly
//! - decor: rules, constraints, modifiers, the instance index and the event-driven decorator
pub mod decor;
pub mod distribution;
pub mod error;
pub mod mask;
pub mod placement;
pub mod scene;

/// Convenient re-exports for common types. Import with `use scene_decor::prelude::*;`.
pub mod prelude {
    pub use crate::decor::constraint::{CheckMode, Constraint, ConstraintSpec};
    pub use crate::decor::events::{
        AsEventSink, DecorEvent, DecorEventKind, EventSink, FnSink, MultiSink, ReleaseReason,
        VecSink,
    };
    pub use crate::decor::index::{InstanceIndex, SpawnedInstanceRecord};
    pub use crate::decor::modifier::{Modifier, ModifierSpec, SpawnedInstance};
    pub use crate::decor::orchestrator::{
        DecorContext, DecorationReport, Decorator, DecoratorConfig, RuleState,
    };
    pub use crate::decor::rule::{
        CompiledRule, CompiledRules, DecorateOnStart, DecorationRule, PrefabEntry, RuleId,
        RuleSet, SpawnHierarchy,
    };
    pub use crate::decor::seed::{derive_seed, seed_for_anchor};
    pub use crate::distribution::{
        Distribution, DistributionKind, GridDistribution, RandomDistribution, SamplePoint,
        SimplexDistribution, StaggeredConcentricDistribution,
    };
    pub use crate::error::{Error, Result};
    pub use crate::mask::affine::Affine2D;
    pub use crate::mask::library::{CompiledMasks, MaskLibrary, MaskSpec};
    pub use crate::mask::texture::{RasterTexture, Texture, TextureChannel, TextureRegistry};
    pub use crate::mask::{Axis, BlendOp, Mask, MaskId, MaskLayer, MaskParams, MaskRef};
    pub use crate::placement::candidate::Candidate;
    pub use crate::placement::{
        cast_ray, resolve_placement, select_nearest, slope_degrees, PlacementMode,
        PlacementSettings, PlacementSite, RaySettings, TargetSettings, Targets,
    };
    pub use crate::scene::memory::{MemoryAnchor, MemoryCollider, MemoryScene};
    pub use crate::scene::physics::{
        ColliderId, HitTarget, Ray, RayHit, RaycastBackend, TargetQuery,
    };
    pub use crate::scene::pool::{
        InstanceId, InstancePool, InstanceTransform, Parent, PrefabId, SimplePool,
    };
    pub use crate::scene::{
        AnchorExtent, AnchorGeometry, AnchorId, AnchorLabels, Pose, RoomId, SceneEvent,
        SceneGraph,
    };
}
