/// A backend decoding error
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Error {
    /// The string message
    pub message: String,
    /// The code number of the error
    pub code: usize,
}

impl Error {
    /// Create a message from a number and string
    pub fn from_msg(code: usize, message: &str) -> Self {
        Self {
            code,
            message: String::from(message),
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "cks09 error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for Error {}
