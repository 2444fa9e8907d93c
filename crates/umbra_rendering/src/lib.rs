//! # UMBRA Rendering
//!
//! Draw-call bookkeeping for two specialized render passes:
//! - Characters: one chunk per character, one draw-call chunk per pass
//! - Decals: one chunk per material, culled per row before drawing
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      FRAME (render thread)                   │
//! ├──────────────────────────────────────────────────────────────┤
//! │  EventBus ─► Manager.create / update_properties / destroy    │
//! │       ↓                                                      │
//! │  Manager.update()      sort chunks, truncate, remap handles  │
//! │       ↓                                                      │
//! │  cull / cull_async     visible rows per chunk (decals)       │
//! │       ↓                                                      │
//! │  build_draw_calls      rebuild dirty, refresh clean          │
//! │       ↓                                                      │
//! │  submit(sink)          ordered draw calls to the GPU layer   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rules
//!
//! - One writer: managers are only mutated from the frame thread
//! - No manager state is touched while a culling job owns it
//! - Contract violations panic, configuration errors are returned

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::perf)]

pub mod character;
pub mod config;
pub mod culling;
pub mod decal;
pub mod draw_call;
pub mod error;
pub mod events;
pub mod factory;
pub mod host;
pub mod stats;

#[cfg(test)]
pub(crate) mod testing;

pub use character::{CharacterChunk, CharacterDesc, CharacterEntityManager, CharacterType, RendererDesc};
pub use config::{CharacterConfig, DecalConfig, GrowthConfig, UmbraConfig};
pub use culling::{BoundingSphere, CullInput, CulledChunk, CullingCamera, Frustum, VisibilityTest};
pub use decal::{DecalChunk, DecalDesc, DecalEntityManager};
pub use draw_call::{DrawCall, DrawCallChunk, DrawCallSink, DrawCallSource, DrawUpdate};
pub use error::{UmbraError, UmbraResult};
pub use events::{EventBus, RenderableEvent, RenderableObserver, SubscriptionId};
pub use factory::{EntityManagerFactory, ManagedCategory, ManagerLease, UmbraContext};
pub use host::{Bounds, HostResources, MaterialId, Matrix4, MeshId, ObjectId, PropertyBlock};
pub use stats::ManagerStats;
