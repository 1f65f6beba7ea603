use tracing::debug;

use crate::protocols::teleinfo::FieldRecord;

use super::FieldSink;

/// Holds a frame's records back until the frame completes.
///
/// On completion the buffered records reach the inner sink in arrival order,
/// followed by `on_frame_complete`. A resync drops the buffer, so values from
/// an abandoned frame never reach the inner sink.
pub struct FrameBatcher<S> {
    inner: S,
    pending: Vec<FieldRecord>,
}

impl<S: FieldSink> FrameBatcher<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            pending: Vec::new(),
        }
    }

    pub fn pending(&self) -> &[FieldRecord] {
        &self.pending
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: FieldSink> FieldSink for FrameBatcher<S> {
    fn on_field(&mut self, record: &FieldRecord) {
        self.pending.push(record.clone());
    }

    fn on_frame_complete(&mut self) {
        for record in self.pending.drain(..) {
            self.inner.on_field(&record);
        }
        self.inner.on_frame_complete();
    }

    fn on_resync(&mut self) {
        if !self.pending.is_empty() {
            debug!(dropped = self.pending.len(), "dropping partial frame");
        }
        self.pending.clear();
        self.inner.on_resync();
    }
}

#[cfg(test)]
mod tests {
    use super::FrameBatcher;
    use crate::emitter::FieldSink;
    use crate::protocols::teleinfo::FieldRecord;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl FieldSink for Recorder {
        fn on_field(&mut self, record: &FieldRecord) {
            self.events.push(format!("{}={}", record.name, record.value));
        }

        fn on_frame_complete(&mut self) {
            self.events.push("publish".to_string());
        }
    }

    #[test]
    fn forwards_only_on_completion() {
        let mut batcher = FrameBatcher::new(Recorder::default());
        batcher.on_field(&FieldRecord::new("ADCO", "1"));
        batcher.on_field(&FieldRecord::new("PAPP", "00750"));
        assert!(batcher.inner().events.is_empty());
        assert_eq!(batcher.pending().len(), 2);

        batcher.on_frame_complete();
        assert_eq!(
            batcher.into_inner().events,
            vec!["ADCO=1", "PAPP=00750", "publish"]
        );
    }

    #[test]
    fn resync_drops_partial_frame() {
        let mut batcher = FrameBatcher::new(Recorder::default());
        batcher.on_field(&FieldRecord::new("ADCO", "12345"));
        batcher.on_resync();
        batcher.on_field(&FieldRecord::new("PTEC", "HC"));
        batcher.on_frame_complete();
        assert_eq!(batcher.into_inner().events, vec!["PTEC=HC", "publish"]);
    }
}
