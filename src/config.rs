/// Tuning knobs for a [`crate::connection::Connection`].
///
/// These are the only recognized options; everything else (reconnection,
/// pooling, TLS, auth) lives outside the core.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Commands whose every argument is short text (no whitespace, no
    /// CR/LF) and whose total encoded length is at or below this many
    /// bytes may be sent in inline form instead of RESP array form.
    ///
    /// This is advisory: the catalog layer decides the `inline_hint` for a
    /// command, and the wire encoder never overrides it.
    pub inline_threshold: usize,
    /// Initial capacity reserved for the connection's read buffer. Tuning
    /// only; has no effect on behavior.
    pub initial_read_buffer_size: usize,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            inline_threshold: 1000,
            initial_read_buffer_size: 8 * 1024,
        }
    }
}

impl Config {
    pub fn new() -> Config {
        Config::default()
    }

    pub fn with_inline_threshold(mut self, inline_threshold: usize) -> Config {
        self.inline_threshold = inline_threshold;
        self
    }

    pub fn with_initial_read_buffer_size(mut self, initial_read_buffer_size: usize) -> Config {
        self.initial_read_buffer_size = initial_read_buffer_size;
        self
    }
}
