//! Scoped board sessions.
//!
//! A [`BoardSession`] holds a board connected for as long as it lives and
//! closes it when dropped, so the port is released on every exit path,
//! early returns and `?` included.

use std::ops::{Deref, DerefMut};

use tracing::warn;

use crate::board::RelayBoard;
use crate::error::RelayError;
use crate::transport::SerialTransport;

/// A connected board that closes itself on drop.
pub struct BoardSession<'a, T: SerialTransport> {
    board: &'a mut RelayBoard<T>,
    finished: bool,
}

impl<T: SerialTransport> BoardSession<'_, T> {
    /// Close the board now and report the outcome.
    ///
    /// A board that was already closed through the session is left alone.
    pub fn finish(mut self) -> Result<(), RelayError> {
        self.finished = true;
        if !self.board.is_connected() {
            return Ok(());
        }
        self.board.close()
    }
}

impl<T: SerialTransport> Deref for BoardSession<'_, T> {
    type Target = RelayBoard<T>;

    fn deref(&self) -> &Self::Target {
        self.board
    }
}

impl<T: SerialTransport> DerefMut for BoardSession<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.board
    }
}

impl<T: SerialTransport> Drop for BoardSession<'_, T> {
    fn drop(&mut self) {
        if !self.finished
            && self.board.is_connected()
            && let Err(e) = self.board.close()
        {
            warn!(port = %self.board.port(), error = %e, "Failed to close board session");
        }
    }
}

impl<T: SerialTransport> RelayBoard<T> {
    /// Connect and return a guard that closes the board when dropped.
    pub fn session(&mut self) -> Result<BoardSession<'_, T>, RelayError> {
        self.connect()?;
        Ok(BoardSession {
            board: self,
            finished: false,
        })
    }

    /// Run `f` on a connected board, closing it afterwards.
    ///
    /// An error from `f` takes precedence over an error from closing.
    pub fn with_session<R>(
        &mut self,
        f: impl FnOnce(&mut RelayBoard<T>) -> Result<R, RelayError>,
    ) -> Result<R, RelayError> {
        let mut session = self.session()?;
        let result = f(&mut *session);
        let closed = session.finish();
        let value = result?;
        closed?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MockOp, MockTransport};

    fn board(mock: &MockTransport) -> RelayBoard<MockTransport> {
        let mut board = RelayBoard::new("DEV0", 2, mock.clone()).unwrap();
        board.set_delay(0);
        board
    }

    #[test]
    fn test_session_closes_on_drop() {
        let mock = MockTransport::new();
        let mut board = board(&mock);
        {
            let mut session = board.session().unwrap();
            session.set_state(&[true, false]).unwrap();
        }
        assert!(!board.is_connected());
        assert_eq!(board.state(), vec![true, false]);
        assert_eq!(
            mock.ops().last(),
            Some(&MockOp::Close {
                port: "DEV0".into()
            })
        );
    }

    #[test]
    fn test_with_session_closes_after_error() {
        let mock = MockTransport::new().fail_write_at(1);
        let mut board = board(&mock);
        let result = board.with_session(|b| b.set_state(&[true, true]));
        assert!(matches!(result, Err(RelayError::Transmit { relay: 1, .. })));
        assert!(!board.is_connected());
    }

    #[test]
    fn test_with_session_allows_closing_inside() {
        let mock = MockTransport::new();
        let mut board = board(&mock);
        board.with_session(|b| b.close()).unwrap();
        assert!(!board.is_connected());
        let closes = mock
            .ops()
            .iter()
            .filter(|op| matches!(op, MockOp::Close { .. }))
            .count();
        assert_eq!(closes, 1);
    }

    #[test]
    fn test_with_session_reports_close_failure() {
        let mock = MockTransport::new().stays_open_after_close();
        let mut board = board(&mock);
        let result = board.with_session(|b| b.set_state_mask(0b11));
        assert!(matches!(result, Err(RelayError::Connection { .. })));
        assert_eq!(board.state(), vec![true, true]);
    }
}
