//! Tracing setup shared by the binaries. Logs go to stderr so reports printed on
//! stdout stay clean, in both plain and JSON mode.

use tracing::{Dispatch, Level};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Install the global subscriber. `RUST_LOG` overrides `level` when set.
///
/// Later calls are no-ops; only one global subscriber can exist per process.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    dispatch(json, env_filter, std::io::stderr).try_init().ok();
}

fn dispatch<W>(json: bool, env_filter: EnvFilter, writer: W) -> Dispatch
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let registry = tracing_subscriber::registry().with(env_filter);

    if json {
        Dispatch::new(registry.with(fmt::layer().with_target(false).json().with_writer(writer)))
    } else {
        Dispatch::new(registry.with(fmt::layer().with_target(false).with_writer(writer)))
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use tracing_subscriber::EnvFilter;

    use super::dispatch;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn json_logs_go_to_the_given_writer() {
        let captured = Captured::default();
        let sink = captured.clone();
        let subscriber = dispatch(true, EnvFilter::new("info"), move || sink.clone());

        tracing::dispatcher::with_default(&subscriber, || {
            tracing::info!(job = "rocket-GK", "saved result");
        });

        let out = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        let line = out.lines().next().unwrap();
        let event: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(event["fields"]["message"], "saved result");
        assert_eq!(event["fields"]["job"], "rocket-GK");
    }
}
