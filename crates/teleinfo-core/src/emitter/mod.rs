//! Field delivery to subscribers.
//!
//! The supervisor pushes every accepted field record into a `FieldSink` as
//! soon as it is parsed, and signals completed frames separately. Delivery is
//! synchronous; a sink that blocks stalls the read loop.

mod batch;

pub use batch::FrameBatcher;

use std::collections::HashMap;

use crate::protocols::teleinfo::FieldRecord;

/// Receives decoded fields and frame completions.
pub trait FieldSink {
    fn on_field(&mut self, record: &FieldRecord);

    /// A frame closed. Per-field consumers can ignore this.
    fn on_frame_complete(&mut self) {}

    /// A start marker replaced an unfinished frame.
    fn on_resync(&mut self) {}
}

impl<T: FieldSink + ?Sized> FieldSink for &mut T {
    fn on_field(&mut self, record: &FieldRecord) {
        (**self).on_field(record);
    }

    fn on_frame_complete(&mut self) {
        (**self).on_frame_complete();
    }

    fn on_resync(&mut self) {
        (**self).on_resync();
    }
}

impl<T: FieldSink + ?Sized> FieldSink for Box<T> {
    fn on_field(&mut self, record: &FieldRecord) {
        (**self).on_field(record);
    }

    fn on_frame_complete(&mut self) {
        (**self).on_frame_complete();
    }

    fn on_resync(&mut self) {
        (**self).on_resync();
    }
}

impl<A: FieldSink, B: FieldSink> FieldSink for (A, B) {
    fn on_field(&mut self, record: &FieldRecord) {
        self.0.on_field(record);
        self.1.on_field(record);
    }

    fn on_frame_complete(&mut self) {
        self.0.on_frame_complete();
        self.1.on_frame_complete();
    }

    fn on_resync(&mut self) {
        self.0.on_resync();
        self.1.on_resync();
    }
}

type FieldCallback = Box<dyn FnMut(&FieldRecord)>;
type FrameCallback = Box<dyn FnMut()>;

/// Subscription registry keyed by field name, ignoring ASCII case.
///
/// Records whose name has no subscriber are dropped silently.
#[derive(Default)]
pub struct FieldEmitter {
    by_name: HashMap<String, Vec<FieldCallback>>,
    catch_all: Vec<FieldCallback>,
    on_frame: Vec<FrameCallback>,
}

impl FieldEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, name: &str, callback: F)
    where
        F: FnMut(&FieldRecord) + 'static,
    {
        self.by_name
            .entry(name.to_ascii_uppercase())
            .or_default()
            .push(Box::new(callback));
    }

    pub fn subscribe_all<F>(&mut self, callback: F)
    where
        F: FnMut(&FieldRecord) + 'static,
    {
        self.catch_all.push(Box::new(callback));
    }

    pub fn subscribe_frames<F>(&mut self, callback: F)
    where
        F: FnMut() + 'static,
    {
        self.on_frame.push(Box::new(callback));
    }

    pub fn has_subscriber(&self, name: &str) -> bool {
        !self.catch_all.is_empty() || self.by_name.contains_key(&name.to_ascii_uppercase())
    }
}

impl FieldSink for FieldEmitter {
    fn on_field(&mut self, record: &FieldRecord) {
        if let Some(callbacks) = self.by_name.get_mut(&record.name.to_ascii_uppercase()) {
            for callback in callbacks.iter_mut() {
                callback(record);
            }
        }
        for callback in self.catch_all.iter_mut() {
            callback(record);
        }
    }

    fn on_frame_complete(&mut self) {
        for callback in self.on_frame.iter_mut() {
            callback();
        }
    }
}
