//! Progress reporting for the runner.
//!
//! The runner never writes to a global logger itself. It reports through an
//! [`EventSink`] handed to it at construction, which is silent by default.

/// Receives progress messages and command invocations from a [`Runner`](super::Runner).
pub trait EventSink: Send + Sync {
    /// A human-readable progress message.
    fn message(&self, message: &str);

    /// An external command is about to run, or would run when `simulated`.
    fn command(&self, program: &str, args: &[String], simulated: bool);
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn message(&self, _message: &str) {}

    fn command(&self, _program: &str, _args: &[String], _simulated: bool) {}
}

/// Forwards to the `log` facade at info level.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn message(&self, message: &str) {
        log::info!("{message}");
    }

    fn command(&self, program: &str, args: &[String], simulated: bool) {
        if simulated {
            log::info!("Simulating {program} {}", args.join(" "));
        } else {
            log::info!("Running {program} {}", args.join(" "));
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::EventSink;
    use std::sync::Mutex;

    /// Keeps every reported command line for later inspection.
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub(crate) commands: Mutex<Vec<Vec<String>>>,
        pub(crate) messages: Mutex<Vec<String>>,
    }

    impl RecordingSink {
        pub(crate) fn commands(&self) -> Vec<Vec<String>> {
            self.commands.lock().unwrap().clone()
        }

        pub(crate) fn messages(&self) -> Vec<String> {
            self.messages.lock().unwrap().clone()
        }
    }

    impl EventSink for RecordingSink {
        fn message(&self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }

        fn command(&self, program: &str, args: &[String], _simulated: bool) {
            let mut line = vec![program.to_string()];
            line.extend(args.iter().cloned());
            self.commands.lock().unwrap().push(line);
        }
    }
}
