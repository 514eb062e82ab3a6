//! Integration tests for the ring buffer and its consumer

use ringprobe::{
    ringbuf::layout::record_size, Event, RingBuffer, RingChannel, RingConfig, RingprobeError,
};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, thread, time::Duration};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Sample {
    id: u32,
    value: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_creation() {
        let ring = RingBuffer::new(4096).unwrap();
        assert_eq!(ring.capacity(), 4096);
        assert_eq!(ring.available(), 4096);
        assert!(ring.is_empty());
        assert!(ring.notifier().is_some());
        assert!(!ring.region().is_file_backed());
    }

    #[test]
    fn test_invalid_capacity_rejected() {
        assert!(matches!(
            RingBuffer::new(1000),
            Err(RingprobeError::InvalidParameter { .. })
        ));
        assert!(RingBuffer::new(8).is_err());
    }

    #[test]
    fn test_channel_trait_reserve_submit() {
        fn publish<C: RingChannel>(channel: &C, bytes: &[u8]) -> ringprobe::Result<()> {
            let mut slot = channel.reserve(bytes.len())?;
            slot.copy_from_slice(bytes);
            channel.submit(slot);
            Ok(())
        }

        let ring = RingBuffer::new(256).unwrap();
        publish(&ring, b"hello").unwrap();
        assert_eq!(RingChannel::capacity(&ring), 256);

        let mut consumer = ring.consumer().unwrap();
        assert_eq!(&*consumer.next().unwrap(), b"hello");
    }

    #[test]
    fn test_channel_trait_discard() {
        let ring = RingBuffer::new(256).unwrap();
        let slot = RingChannel::reserve(&ring, 32).unwrap();
        RingChannel::discard(&ring, slot);

        let mut consumer = ring.consumer().unwrap();
        assert!(consumer.next().is_none());
        assert!(ring.is_empty());
        assert_eq!(ring.stats().discarded, 1);
    }

    #[test]
    fn test_decode_typed_records() {
        let ring = RingBuffer::new(256).unwrap();
        let sample = Sample { id: 3, value: 99 };
        let bytes = ringprobe::codec::encode(&sample).unwrap();

        let mut slot = ring.reserve(bytes.len()).unwrap();
        slot.copy_from_slice(&bytes);
        slot.submit();

        let mut consumer = ring.consumer().unwrap();
        let item = consumer.next().unwrap();
        assert_eq!(item.decode::<Sample>().unwrap(), sample);
    }

    #[test]
    fn test_wraparound_many_times() {
        let ring = RingBuffer::new(128).unwrap();
        let mut consumer = ring.consumer().unwrap();

        for round in 0..1000u64 {
            let len = (round % 40) as usize + 1;
            let mut slot = ring.reserve(len).unwrap();
            slot.fill(round as u8);
            slot.submit();

            let item = consumer.next().unwrap();
            assert_eq!(item.len(), len);
            assert!(item.iter().all(|b| *b == round as u8));
        }

        assert!(ring.is_empty());
        let stats = ring.stats();
        assert_eq!(stats.submitted, 1000);
        assert_eq!(stats.consumed, 1000);
    }

    #[test]
    fn test_record_sizes_are_aligned() {
        assert_eq!(record_size(0), 8);
        assert_eq!(record_size(1), 16);
        assert_eq!(record_size(Event::SIZE), 24);
        assert_eq!(record_size(4087), 4096);
    }

    #[test]
    fn test_out_of_order_submit() {
        let ring = RingBuffer::new(256).unwrap();
        let mut consumer = ring.consumer().unwrap();

        let mut a = ring.reserve(8).unwrap();
        let mut b = ring.reserve(8).unwrap();
        b.fill(2);
        b.submit();
        assert!(consumer.next().is_none());

        a.fill(1);
        a.submit();
        let records = consumer.drain();
        assert_eq!(records, vec![vec![1; 8], vec![2; 8]]);
    }

    #[test]
    fn test_wait_times_out_without_notifications() {
        let config = RingConfig::new("quiet", 256).with_notifications(false);
        let ring = RingBuffer::with_config(config).unwrap();
        assert!(ring.notifier().is_none());

        let mut consumer = ring.consumer().unwrap();
        assert!(!consumer.wait(Some(Duration::from_millis(5))).unwrap());

        ring.reserve(4).unwrap().submit();
        assert!(consumer.wait(Some(Duration::from_millis(5))).unwrap());
    }

    #[test]
    fn test_consumer_thread_receives_everything() {
        let ring = Arc::new(RingBuffer::new(1024).unwrap());
        let total = 5000u32;

        let reader = {
            let ring = Arc::clone(&ring);
            thread::spawn(move || {
                let mut consumer = ring.consumer().unwrap();
                let mut expected = 0u32;
                while expected < total {
                    if !consumer.wait(Some(Duration::from_millis(100))).unwrap() {
                        continue;
                    }
                    while let Some(item) = consumer.next() {
                        assert_eq!(&*item, &expected.to_ne_bytes());
                        expected += 1;
                    }
                }
                expected
            })
        };

        for i in 0..total {
            loop {
                match ring.reserve(4) {
                    Ok(mut slot) => {
                        slot.copy_from_slice(&i.to_ne_bytes());
                        slot.submit();
                        break;
                    }
                    Err(e) => {
                        assert!(e.is_no_space());
                        thread::yield_now();
                    }
                }
            }
        }

        assert_eq!(reader.join().unwrap(), total);
    }
}
