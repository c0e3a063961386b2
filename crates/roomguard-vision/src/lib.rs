//! roomguard-vision: the camera and face-matching ports over HTTP.
//!
//! - [`HttpFrameSource`]: JPEG snapshots from an IP camera or a local capture bridge.
//! - [`SidecarFaceMatcher`]: face detection/encoding by a sidecar service, trusted-set
//!   enrollment from a directory of photos, Euclidean comparison with a tolerance.

pub mod camera;
pub mod error;
pub mod faces;

pub use camera::HttpFrameSource;
pub use error::VisionError;
pub use faces::{trusted_images, EncodeResponse, SidecarFaceMatcher};
