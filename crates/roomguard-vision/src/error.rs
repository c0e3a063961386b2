//! Vision adapter errors.

use roomguard_core::GuardError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Camera not open")]
    NotOpen,

    #[error("Camera returned {status}")]
    CameraStatus { status: u16 },

    #[error("Camera returned an empty frame")]
    EmptyFrame,

    #[error("Face service returned {status}: {body}")]
    FaceService { status: u16, body: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

impl VisionError {
    /// Camera-side failures become `GuardError::Capture`.
    pub fn into_capture(self) -> GuardError {
        GuardError::Capture(self.to_string())
    }

    /// Matcher-side failures become `GuardError::Classification`.
    pub fn into_classification(self) -> GuardError {
        GuardError::Classification(self.to_string())
    }
}
