//! The emit program: publish `{magic, !magic}` for each invocation

use std::sync::Arc;

use log::{debug, trace, warn};

use crate::{
    channel::RingChannel,
    error::Result,
    event::{EmitArgs, Event},
    maps::BoundedMap,
};

use super::EmitStatus;

/// Entry point publishing one [`Event`] per invocation
///
/// The ring and the side table are injected. The side table is held for
/// programs that need per-key state; emitting never touches it.
#[derive(Debug)]
pub struct EmitProgram<R: RingChannel, M: BoundedMap> {
    ring: Arc<R>,
    map: Arc<M>,
}

impl<R: RingChannel, M: BoundedMap> EmitProgram<R, M> {
    pub fn new(ring: Arc<R>, map: Arc<M>) -> Self {
        Self { ring, map }
    }

    /// Reserve a slot, write the event and submit it
    ///
    /// Either the whole event is published or nothing is: a failed
    /// reservation returns before any write, and a failed encode discards
    /// the slot.
    pub fn try_emit(&self, args: &EmitArgs) -> Result<Event> {
        let mut slot = self.ring.reserve(Event::SIZE)?;

        let event = Event::from_magic(args.magic);
        if let Err(e) = event.encode_into(&mut slot[..]) {
            self.ring.discard(slot);
            return Err(e);
        }

        self.ring.submit(slot);
        trace!("emitted {}", event);
        Ok(event)
    }

    /// Run once and report the outcome
    ///
    /// Any failure leaves nothing published and reports `NoSpace`; failures
    /// other than a full or contended ring are logged as warnings.
    pub fn emit(&self, args: &EmitArgs) -> EmitStatus {
        match self.try_emit(args) {
            Ok(_) => EmitStatus::Submitted,
            Err(e) if e.is_no_space() => {
                debug!("emit rejected for magic {:#x}: {}", args.magic, e);
                EmitStatus::NoSpace
            }
            Err(e) => {
                warn!("emit failed for magic {:#x}: {}", args.magic, e);
                EmitStatus::NoSpace
            }
        }
    }

    /// Run once and return the integer status (`0` or `42`)
    pub fn run(&self, args: &EmitArgs) -> u32 {
        self.emit(args).code()
    }

    /// Decode the arguments from a raw context buffer, then run
    pub fn test_run(&self, ctx: &[u8]) -> Result<u32> {
        let args = EmitArgs::from_context(ctx)?;
        Ok(self.run(&args))
    }

    /// The ring this program publishes into
    pub fn ring(&self) -> &Arc<R> {
        &self.ring
    }

    /// The injected side table
    pub fn map(&self) -> &Arc<M> {
        &self.map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::RingprobeError,
        maps::HashTable,
        program::{EMIT_NO_SPACE, EMIT_OK},
    };
    use std::sync::Mutex;

    /// Channel double recording what gets submitted
    #[derive(Default)]
    struct RecordingChannel {
        accept: bool,
        /// Hand out slots one byte shorter than requested
        short: bool,
        submitted: Mutex<Vec<Vec<u8>>>,
        discarded: Mutex<usize>,
    }

    impl RingChannel for RecordingChannel {
        type Slot<'a> = Vec<u8>;

        fn reserve(&self, len: usize) -> Result<Vec<u8>> {
            match (self.accept, self.short) {
                (false, _) => Err(RingprobeError::insufficient_space(len, 0)),
                (true, true) => Ok(vec![0; len - 1]),
                (true, false) => Ok(vec![0; len]),
            }
        }

        fn submit(&self, slot: Vec<u8>) {
            self.submitted.lock().unwrap().push(slot);
        }

        fn discard(&self, _slot: Vec<u8>) {
            *self.discarded.lock().unwrap() += 1;
        }

        fn capacity(&self) -> usize {
            usize::MAX
        }
    }

    fn program(accept: bool) -> EmitProgram<RecordingChannel, HashTable> {
        let ring = RecordingChannel {
            accept,
            ..Default::default()
        };
        EmitProgram::new(Arc::new(ring), Arc::new(HashTable::default()))
    }

    #[test]
    fn test_emit_writes_complement() {
        let program = program(true);
        assert_eq!(program.run(&EmitArgs::new(0xDEAD_BEEF)), EMIT_OK);

        let submitted = program.ring().submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        let event = Event::decode(&submitted[0]).unwrap();
        assert_eq!(event.magic, 0xDEAD_BEEF);
        assert_eq!(event.inverse_magic, !0xDEAD_BEEFu64);
    }

    #[test]
    fn test_rejected_reservation_has_no_side_effects() {
        let program = program(false);
        assert_eq!(program.run(&EmitArgs::new(1)), EMIT_NO_SPACE);
        assert!(program.ring().submitted.lock().unwrap().is_empty());
        assert_eq!(*program.ring().discarded.lock().unwrap(), 0);
        assert!(program.map().is_empty());
    }

    #[test]
    fn test_encode_failure_discards_slot() {
        let ring = RecordingChannel {
            accept: true,
            short: true,
            ..Default::default()
        };
        let program = EmitProgram::new(Arc::new(ring), Arc::new(HashTable::default()));

        let err = program.try_emit(&EmitArgs::new(3)).unwrap_err();
        assert!(matches!(err, RingprobeError::Serialization { .. }));
        assert!(!err.is_no_space());

        assert_eq!(program.emit(&EmitArgs::new(3)), EmitStatus::NoSpace);
        assert!(program.ring().submitted.lock().unwrap().is_empty());
        assert_eq!(*program.ring().discarded.lock().unwrap(), 2);
    }

    #[test]
    fn test_run_from_context() {
        let program = program(true);
        assert_eq!(program.test_run(&7u64.to_ne_bytes()).unwrap(), EMIT_OK);
        assert!(program.test_run(&[0u8; 4]).is_err());
        assert_eq!(program.ring().submitted.lock().unwrap().len(), 1);
    }
}
