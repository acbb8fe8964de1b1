use std::fmt;

/// Failure taxonomy for the per-image pipeline.
///
/// Each variant is contained at the smallest unit that can fail on its own:
/// capture/recognition failures degrade one image, geometry failures skip one
/// fragment, translation failures fall back to the original text and analysis
/// failures substitute the neutral color pair.
#[derive(Debug)]
pub enum Failure {
    Capture(anyhow::Error),
    Recognition(anyhow::Error),
    Translation(anyhow::Error),
    Geometry(anyhow::Error),
    Analysis(anyhow::Error),
}

impl Failure {
    pub fn stage(&self) -> &'static str {
        match self {
            Failure::Capture(_) => "capture",
            Failure::Recognition(_) => "recognition",
            Failure::Translation(_) => "translation",
            Failure::Geometry(_) => "geometry",
            Failure::Analysis(_) => "analysis",
        }
    }

    pub fn source_error(&self) -> &anyhow::Error {
        match self {
            Failure::Capture(err)
            | Failure::Recognition(err)
            | Failure::Translation(err)
            | Failure::Geometry(err)
            | Failure::Analysis(err) => err,
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage(), self.source_error())
    }
}

impl std::error::Error for Failure {}
