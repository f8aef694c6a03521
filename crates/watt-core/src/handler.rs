//! Broker event handling.
//!
//! The transport layer owns the broker connection and translates what it
//! receives into [`BrokerEvent`]s. [`TelemetryHandler`] reacts to them: link
//! status changes become status screens and published payloads are decoded and
//! folded into the [`DailyAggregator`] passed in by the caller.

use log::{info, warn};

use crate::aggregator::{DailyAggregator, LocalTime};
use crate::sample::{DecodeError, SampleDecoder};
use crate::summary::Summary;

/// Connection progress shown on the display before telemetry arrives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// Waiting for the broker to accept the connection
    Connecting,
    /// Broker accepted the connection
    Connected,
    /// Broker acknowledged the telemetry subscription
    Subscribed,
}

impl LinkStatus {
    /// Get the display label for this status
    pub const fn label(self) -> &'static str {
        match self {
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
            Self::Subscribed => "Subscribed",
        }
    }
}

/// Events delivered by the transport layer
#[derive(Debug, Clone, Copy)]
pub enum BrokerEvent<'a> {
    /// Connection acknowledged by the broker
    Connected { return_code: u8 },
    /// Subscription acknowledged by the broker
    Subscribed { message_id: u16 },
    /// A message was published on a subscribed topic
    Publish { topic: &'a str, payload: &'a [u8] },
}

/// What the display should do in response to an event
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HandlerOutcome {
    /// Show a link status screen
    Status(LinkStatus),
    /// Show the updated daily report
    Report(Summary),
    /// The payload was rejected; nothing changed
    Dropped(DecodeError),
}

/// Routes broker events to the aggregator.
pub struct TelemetryHandler<D> {
    decoder: D,
}

impl<D: SampleDecoder> TelemetryHandler<D> {
    pub fn new(decoder: D) -> Self {
        Self { decoder }
    }

    /// Handle a single broker event.
    ///
    /// Only `Publish` events with a decodable payload touch `aggregator`.
    pub fn handle(
        &self,
        aggregator: &mut DailyAggregator,
        event: BrokerEvent<'_>,
        now: LocalTime,
    ) -> HandlerOutcome {
        match event {
            BrokerEvent::Connected { return_code } => {
                info!("CONNACK: {}", return_code);
                HandlerOutcome::Status(LinkStatus::Connected)
            }
            BrokerEvent::Subscribed { message_id } => {
                info!("Subscription {} acknowledged", message_id);
                HandlerOutcome::Status(LinkStatus::Subscribed)
            }
            BrokerEvent::Publish { topic, payload } => match self.decoder.decode(payload) {
                Ok(sample) => {
                    info!("Wattage on {}: {}", topic, sample.wattage);
                    HandlerOutcome::Report(aggregator.ingest(sample, now))
                }
                Err(e) => {
                    warn!("Dropping payload on {}: {}", topic, e);
                    HandlerOutcome::Dropped(e)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::{JsonSampleDecoder, Sample};

    const NOW: LocalTime = LocalTime::new(120, 18, 30);
    const TOPIC: &str = "home/power";

    fn publish(payload: &[u8]) -> BrokerEvent<'_> {
        BrokerEvent::Publish {
            topic: TOPIC,
            payload,
        }
    }

    #[test]
    fn test_link_events_map_to_status() {
        let handler = TelemetryHandler::new(JsonSampleDecoder);
        let mut aggregator = DailyAggregator::new();

        let connected = handler.handle(
            &mut aggregator,
            BrokerEvent::Connected { return_code: 0 },
            NOW,
        );
        assert_eq!(connected, HandlerOutcome::Status(LinkStatus::Connected));

        let subscribed = handler.handle(
            &mut aggregator,
            BrokerEvent::Subscribed { message_id: 7 },
            NOW,
        );
        assert_eq!(subscribed, HandlerOutcome::Status(LinkStatus::Subscribed));

        assert_eq!(aggregator.current_day(), None, "status events never ingest");
    }

    #[test]
    fn test_publish_ingests_decoded_sample() {
        let handler = TelemetryHandler::new(JsonSampleDecoder);
        let mut aggregator = DailyAggregator::new();

        let outcome = handler.handle(
            &mut aggregator,
            publish(br#"{"duration": 1000, "wattage": 340, "pulses": 2}"#),
            NOW,
        );

        let HandlerOutcome::Report(summary) = outcome else {
            panic!("expected a report, got {:?}", outcome);
        };
        assert_eq!(summary.instant_watts, 340);
        assert_eq!(summary.total_pulses, 2);
        assert_eq!(aggregator.histogram()[3], 2);
    }

    #[test]
    fn test_malformed_publish_leaves_state_untouched() {
        let handler = TelemetryHandler::new(JsonSampleDecoder);
        let mut aggregator = DailyAggregator::new();

        handler.handle(
            &mut aggregator,
            publish(br#"{"duration": 1000, "wattage": 340, "pulses": 2}"#),
            NOW,
        );
        let before = aggregator.clone();

        let outcome = handler.handle(&mut aggregator, publish(br#"{"wattage": 9000}"#), NOW);

        assert_eq!(outcome, HandlerOutcome::Dropped(DecodeError::MalformedJson));
        assert_eq!(aggregator, before);
    }

    /// Decoder for a fixed-width little-endian layout, standing in for a
    /// second wire format.
    struct RawDecoder;

    impl SampleDecoder for RawDecoder {
        fn decode(&self, payload: &[u8]) -> Result<Sample, DecodeError> {
            let [d0, d1, d2, d3, w0, w1, w2, w3, p0, p1, p2, p3] = *payload else {
                return Err(DecodeError::MalformedJson);
            };
            Ok(Sample::new(
                u32::from_le_bytes([d0, d1, d2, d3]),
                i32::from_le_bytes([w0, w1, w2, w3]),
                u32::from_le_bytes([p0, p1, p2, p3]),
            ))
        }
    }

    #[test]
    fn test_handler_uses_its_decoder() {
        let handler = TelemetryHandler::new(RawDecoder);
        let mut aggregator = DailyAggregator::new();
        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&500u32.to_le_bytes());
        bytes[4..8].copy_from_slice(&2500i32.to_le_bytes());
        bytes[8..].copy_from_slice(&1u32.to_le_bytes());

        let outcome = handler.handle(&mut aggregator, publish(&bytes), NOW);
        assert!(matches!(outcome, HandlerOutcome::Report(s) if s.histogram[19] == 1));

        let json = handler.handle(
            &mut aggregator,
            publish(br#"{"duration": 1000, "wattage": 340, "pulses": 2}"#),
            NOW,
        );
        assert!(matches!(json, HandlerOutcome::Dropped(_)));
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(LinkStatus::Connecting.label(), "Connecting");
        assert_eq!(LinkStatus::Connected.label(), "Connected");
        assert_eq!(LinkStatus::Subscribed.label(), "Subscribed");
    }
}
