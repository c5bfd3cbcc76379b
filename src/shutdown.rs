/// Handed to every background task when the process is stopping. Drop it once the task has
/// wound down; main waits until every copy is gone.
#[derive(Clone, Debug)]
pub struct Shutdown {
    pub(crate) _handle: tokio::sync::mpsc::Sender<()>,
}
