use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;

pub type OommfcResult<T> = Result<T, OommfcError>;
pub type LoweringResult<T> = OommfcResult<T>;
pub type DriveResult<T> = OommfcResult<T>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OommfcErrorCategory {
    InvalidParameter,
    BadTermConfiguration,
    UnsupportedOnPlatform,
    DirectoryExists,
    NotFound,
    ParseFailure,
    EngineFailure,
    IoSystem,
    Internal,
}

impl OommfcErrorCategory {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidParameter => "InvalidParameter",
            Self::BadTermConfiguration => "BadTermConfiguration",
            Self::UnsupportedOnPlatform => "UnsupportedOnPlatform",
            Self::DirectoryExists => "DirectoryExists",
            Self::NotFound => "NotFound",
            Self::ParseFailure => "ParseFailure",
            Self::EngineFailure => "EngineFailure",
            Self::IoSystem => "IoSystem",
            Self::Internal => "Internal",
        }
    }

    pub const fn exit_code(self) -> i32 {
        match self {
            Self::InvalidParameter => 2,
            Self::BadTermConfiguration => 3,
            Self::UnsupportedOnPlatform => 4,
            Self::DirectoryExists => 5,
            Self::NotFound => 6,
            Self::ParseFailure => 7,
            Self::EngineFailure => 8,
            Self::IoSystem => 9,
            Self::Internal => 10,
        }
    }
}

impl Display for OommfcErrorCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exit status and captured streams of one engine invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunOutput {
    pub returncode: i32,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
}

impl RunOutput {
    pub fn success() -> Self {
        Self::default()
    }

    pub const fn is_success(&self) -> bool {
        self.returncode == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OommfcError {
    category: OommfcErrorCategory,
    placeholder: &'static str,
    message: String,
    engine_output: Option<RunOutput>,
}

impl OommfcError {
    pub fn new(
        category: OommfcErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
            engine_output: None,
        }
    }

    pub fn invalid_parameter(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(OommfcErrorCategory::InvalidParameter, placeholder, message)
    }

    pub fn bad_term_configuration(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(
            OommfcErrorCategory::BadTermConfiguration,
            placeholder,
            message,
        )
    }

    pub fn unsupported_on_platform(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(
            OommfcErrorCategory::UnsupportedOnPlatform,
            placeholder,
            message,
        )
    }

    pub fn directory_exists(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(OommfcErrorCategory::DirectoryExists, placeholder, message)
    }

    pub fn not_found(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(OommfcErrorCategory::NotFound, placeholder, message)
    }

    pub fn parse_failure(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(OommfcErrorCategory::ParseFailure, placeholder, message)
    }

    pub fn engine_failure(
        placeholder: &'static str,
        message: impl Into<String>,
        output: RunOutput,
    ) -> Self {
        let mut error = Self::new(OommfcErrorCategory::EngineFailure, placeholder, message);
        error.engine_output = Some(output);
        error
    }

    pub fn io_system(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(OommfcErrorCategory::IoSystem, placeholder, message)
    }

    pub fn internal(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(OommfcErrorCategory::Internal, placeholder, message)
    }

    /// Maps an I/O failure, keeping missing paths distinguishable from other system errors.
    pub fn from_io(placeholder: &'static str, context: impl Display, source: &io::Error) -> Self {
        let message = format!("{context}: {source}");
        if source.kind() == io::ErrorKind::NotFound {
            Self::not_found(placeholder, message)
        } else {
            Self::io_system(placeholder, message)
        }
    }

    pub const fn category(&self) -> OommfcErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn engine_output(&self) -> Option<&RunOutput> {
        self.engine_output.as_ref()
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.placeholder, self.message)
    }

    pub fn fatal_exit_line(&self) -> String {
        format!("FATAL EXIT CODE: {}", self.exit_code())
    }
}

impl Display for OommfcError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category.as_str(),
            self.placeholder,
            self.message
        )?;
        if let Some(output) = &self.engine_output {
            if let Some(stderr) = output.stderr.as_deref().filter(|text| !text.trim().is_empty()) {
                write!(f, "\nengine stderr:\n{}", stderr.trim_end())?;
            }
        }
        Ok(())
    }
}

impl Error for OommfcError {}
