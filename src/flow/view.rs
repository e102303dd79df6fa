use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::flow::engine::{Flow, SubscriptionId};
use crate::state::State;

/// Presentation layer fed with every committed state.
pub trait View: Send + Sync {
    fn render(&self, state: &State);
}

/// Attach `view` to `flow`; it renders every new state from now on.
pub fn render<V>(flow: &Flow, view: V) -> SubscriptionId
where
    V: View + 'static,
{
    let view = Arc::new(view);
    flow.subscribe(move |state| view.render(state))
}

/// Writes each state as one line of JSON.
pub struct JsonLinesView<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesView<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

impl<W: Write + Send> View for JsonLinesView<W> {
    fn render(&self, state: &State) {
        let mut writer = self.writer.lock();
        if let Err(err) = write_line(&mut *writer, state) {
            tracing::warn!(error = %err, "Failed to render state");
        }
    }
}

fn write_line<W: Write>(writer: &mut W, state: &State) -> std::io::Result<()> {
    serde_json::to_writer(&mut *writer, state)?;
    writer.write_all(b"\n")?;
    writer.flush()
}
