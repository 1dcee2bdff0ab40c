//! Typed protocol error boundary.
//!
//! Handlers talk in `color_eyre::Result` for anything that bubbles up through
//! `?`. But the wire protocol needs a stable
//! `ACK [<code>@<index>] {<command>} <message>` line, so command dispatch
//! translates any error into an [`AckError`] at the boundary, keeping the
//! same small fixed set of error codes clients already parse.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckCode {
    NotList = 1,
    Arg = 2,
    Password = 3,
    Permission = 4,
    Unknown = 5,
    NoExist = 50,
    PlaylistMax = 51,
    System = 52,
    PlaylistLoad = 53,
    UpdateAlready = 54,
    PlayerSync = 55,
    Exist = 56,
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct AckError {
    pub code: AckCode,
    pub message: String,
}

impl AckError {
    pub fn new(code: AckCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn unknown_command(name: &str) -> Self {
        Self::new(AckCode::Unknown, format!("unknown command \"{name}\""))
    }

    pub fn permission() -> Self {
        Self::new(AckCode::Permission, "you don't have permission for \"this\"")
    }

    pub fn arg(message: impl Into<String>) -> Self {
        Self::new(AckCode::Arg, message)
    }

    pub fn no_exist(message: impl Into<String>) -> Self {
        Self::new(AckCode::NoExist, message)
    }

    pub fn system(message: impl Into<String>) -> Self {
        Self::new(AckCode::System, message)
    }

    /// Render as the wire line, given the 0-based index of the failing
    /// command within the current command list (0 outside of one).
    pub fn render(&self, command_name: &str, index: u32) -> String {
        format!(
            "ACK [{}@{index}] {{{command_name}}} {}\n",
            self.code as i32, self.message
        )
    }
}

/// Convert any non-protocol error (I/O, database, etc.) into ACK_ERROR_SYSTEM
/// so a handler can use `?` against ordinary fallible operations and still
/// produce a well-formed wire response.
pub fn to_ack(err: &color_eyre::Report) -> AckError {
    if let Some(ack) = err.downcast_ref::<AckError>() {
        return AckError::new(ack.code, ack.message.clone());
    }
    AckError::system(format!("{err:#}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_ack_line() {
        let err = AckError::arg("Number is negative: -2");
        assert_eq!(
            err.render("delete", 0),
            "ACK [2@0] {delete} Number is negative: -2\n"
        );
    }
}
