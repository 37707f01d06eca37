//! Frame update engine
//!
//! All gameplay logic lives here. Rendering is reached only through the
//! [`Renderer`](crate::renderer::Renderer) trait, so everything in this module
//! runs headless in tests:
//! - Fixed substeps per frame
//! - Seeded RNG only (view shake)
//! - Stable obstacle indices within a run

pub mod collision;
pub mod level;
pub mod physics;
pub mod scene;
pub mod session;
pub mod shake;
pub mod state;
pub mod stream;
pub mod world;

pub use collision::CollisionReport;
pub use level::{Level, LevelCatalog, StreamConfig};
pub use physics::{FrameOutcome, SteerInput, StepParams, step_frame};
pub use scene::{DirectionalLight, Light, Material, Scene};
pub use session::{CountdownDisplay, GameEvent, GameSession, InputEvent};
pub use shake::{ViewOffset, ViewShake};
pub use state::{Camera, GamePhase, Obstacle, ObstacleShape, Player, Projectile};
pub use stream::ObstacleWindow;
pub use world::World;
