use crate::fields::FieldTable;
use crate::frame::{decode_frame, FrameAssembler};
use crate::payload::PayloadProcessor;

/// Everything between a line of stream text and the shared state.
///
/// Nothing here returns an error: bad frames are logged and skipped so the
/// reader can keep going.
pub struct MetadataPipeline {
    assembler: FrameAssembler,
    fields: FieldTable,
    processor: PayloadProcessor,
}

impl MetadataPipeline {
    pub fn new(fields: FieldTable, processor: PayloadProcessor, max_frame_bytes: usize) -> Self {
        Self {
            assembler: FrameAssembler::new(max_frame_bytes),
            fields,
            processor,
        }
    }

    pub fn push_line(&mut self, line: &str) {
        for frame in self.assembler.push_line(line) {
            self.handle_frame(&frame);
        }
    }

    pub fn reset(&mut self) {
        self.assembler.reset();
    }

    fn handle_frame(&self, frame: &str) {
        let item = match decode_frame(frame) {
            Ok(item) => item,
            Err(reason) => {
                log::trace!("Dropping frame ({})", reason);
                return;
            }
        };

        let Some(field) = self.fields.route(&item.code) else {
            log::trace!("Ignoring item with code {}", item.code);
            return;
        };

        if let Err(e) = self.processor.process(field, &item) {
            log::warn!("Failed to apply {:?} item ({} bytes): {}", field, item.length, e);
        }
    }
}
