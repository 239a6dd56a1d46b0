use crate::error::TransportError;

/// A browser window showing the audience page, as far as the presenter can
/// observe it. Browsers expose no destroy notification, so liveness is polled
/// through [`BrowserWindow::is_closed`].
pub trait BrowserWindow: Send {
    /// Identifies the window in messages it sends back.
    fn id(&self) -> &str;

    fn is_closed(&self) -> bool;

    fn focus(&self);

    fn close(&self);

    /// Cross-window message with a JSON body.
    fn post_message(&self, json: &str) -> Result<(), TransportError>;
}
