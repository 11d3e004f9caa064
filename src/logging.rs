use std::io;
use tracing::Subscriber;
use tracing_appender::rolling;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer};

const CONSOLE_FILTER: &str = "info,llm_request=info,db_query=warn,sqlx=off";
const FILE_FILTER: &str = "llm_request=debug,info,sqlx=info";

/// Console layer. Stdout is reserved for command output, so production passes stderr.
fn console_layer<S, W>(writer: W) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    // RUST_LOG wins over the built-in console filter when set
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(CONSOLE_FILTER));

    fmt::layer().with_writer(writer).with_filter(filter)
}

pub fn configure_logging() {
    let file_appender = rolling::daily("logs", "storyline.log");
    let file_log = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_filter(EnvFilter::new(FILE_FILTER));

    tracing_subscriber::Registry::default()
        .with(console_layer(io::stderr))
        .with(file_log)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

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

    impl<'w> MakeWriter<'w> for Captured {
        type Writer = Captured;

        fn make_writer(&'w self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_console_layer_writes_to_given_writer() {
        let captured = Captured::default();
        let subscriber =
            tracing_subscriber::Registry::default().with(console_layer(captured.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!("database busy");
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("database busy"));
    }
}
