use tracing::{error, info, warn};

use tix_processor_core::{
    AnalysisError, HistogramError, HurstError, analyze, collect_observations, decode_reports,
};

use crate::api::{ApiReport, EgressError, ResultsSink};

/// Below this batch size the estimators degrade; worth an operator warning.
const SMALL_BATCH_WARNING: usize = 1024;

/// Broker outcome for one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Ack,
    Reject { requeue: bool },
}

/// Failure classes behind the ack/reject policy. Input-side classes are
/// poison (a retry can never fix the data); egress-side classes are
/// transient or operator-fixable, so the message goes back to the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    MalformedInput,
    InsufficientData,
    NumericalDegeneracy,
    TransientEgress,
    Configuration,
}

impl FailureClass {
    pub fn requeue(self) -> bool {
        matches!(
            self,
            FailureClass::TransientEgress | FailureClass::Configuration
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FailureClass::MalformedInput => "malformed-input",
            FailureClass::InsufficientData => "insufficient-data",
            FailureClass::NumericalDegeneracy => "numerical-degeneracy",
            FailureClass::TransientEgress => "transient-egress",
            FailureClass::Configuration => "configuration",
        }
    }

    fn of_analysis(error: &AnalysisError) -> FailureClass {
        match error {
            AnalysisError::NoShortObservations => FailureClass::MalformedInput,
            AnalysisError::DegenerateHistogram(HistogramError::TooFewDatapoints { .. }) => {
                FailureClass::InsufficientData
            }
            AnalysisError::DegenerateHistogram(HistogramError::ZeroWidthBin { .. }) => {
                FailureClass::NumericalDegeneracy
            }
            AnalysisError::Clock(_)
            | AnalysisError::InsufficientSpan { .. }
            | AnalysisError::ExcessiveGap { .. }
            | AnalysisError::NoQualifyingMinutes { .. }
            | AnalysisError::Hurst(HurstError::SeriesTooShort { .. }) => {
                FailureClass::InsufficientData
            }
            AnalysisError::Hurst(HurstError::ConstantSeries) => FailureClass::NumericalDegeneracy,
        }
    }

    fn of_egress(error: &EgressError) -> FailureClass {
        match error {
            EgressError::MissingCredentials => FailureClass::Configuration,
            // An auth-rejected POST means the operator-supplied
            // credentials are wrong, not that the API is having a moment.
            EgressError::Status { status: 401 | 403 } => FailureClass::Configuration,
            EgressError::Status { .. } | EgressError::Transport(_) => {
                FailureClass::TransientEgress
            }
        }
    }
}

/// Process one queue message body end to end: decode, aggregate, analyze,
/// post. The returned disposition encodes the ack/reject policy:
/// malformed or unanalyzable input is poison (no requeue), failed egress
/// is transient (requeue).
pub async fn process_message<S: ResultsSink>(body: &[u8], sink: &S) -> Disposition {
    let reports = match decode_reports(body) {
        Ok(reports) => reports,
        Err(err) => {
            error!(error = %err, "rejecting malformed message without requeue");
            return Disposition::Reject { requeue: false };
        }
    };

    let Some((ip, observations)) = collect_observations(&reports) else {
        error!(
            reports = reports.len(),
            "rejecting message with no observations without requeue"
        );
        return Disposition::Reject { requeue: false };
    };
    let user_id = reports[0].user_id;
    let installation_id = reports[0].installation_id;

    if observations.len() < SMALL_BATCH_WARNING {
        warn!(
            ip = %ip,
            observations = observations.len(),
            "small batch; estimator confidence is reduced"
        );
    }
    info!(
        ip = %ip,
        observations = observations.len(),
        user_id,
        installation_id,
        "analyzing batch"
    );

    let result = match analyze(&observations) {
        Ok(result) => result,
        Err(err) => {
            let class = FailureClass::of_analysis(&err);
            error!(
                error = %err,
                class = class.as_str(),
                ip = %ip,
                observations = observations.len(),
                "analysis failed"
            );
            return Disposition::Reject {
                requeue: class.requeue(),
            };
        }
    };

    let report = ApiReport::new(&result, &ip);
    match sink.post(user_id, installation_id, &report).await {
        Ok(()) => {
            info!(ip = %ip, timestamp = result.timestamp, "results posted");
            Disposition::Ack
        }
        Err(err) => {
            let class = FailureClass::of_egress(&err);
            warn!(
                error = %err,
                class = class.as_str(),
                ip = %ip,
                "could not post results; rejecting with requeue"
            );
            Disposition::Reject {
                requeue: class.requeue(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use tix_processor_core::{Observation, PacketType, Report, encode_reports};

    use super::{Disposition, process_message};
    use crate::api::{ApiReport, EgressError, ResultsSink};

    struct StubSink {
        responses: Mutex<VecDeque<Result<(), EgressError>>>,
        posted: Mutex<Vec<ApiReport>>,
    }

    impl StubSink {
        fn new(responses: Vec<Result<(), EgressError>>) -> Self {
            StubSink {
                responses: Mutex::new(responses.into()),
                posted: Mutex::new(Vec::new()),
            }
        }

        fn posted(&self) -> Vec<ApiReport> {
            self.posted.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ResultsSink for StubSink {
        async fn post(
            &self,
            _user_id: u64,
            _installation_id: u64,
            report: &ApiReport,
        ) -> Result<(), EgressError> {
            let response = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(()));
            if response.is_ok() {
                self.posted.lock().unwrap().push(report.clone());
            }
            response
        }
    }

    fn jitter(state: &mut u64) -> i64 {
        *state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((*state >> 33) % 100_000) as i64
    }

    fn analyzable_observations() -> Vec<Observation> {
        let start: i64 = 1_700_000_000;
        let mut state = 9u64;
        (0..1800)
            .map(|i| {
                let day_timestamp = start + i;
                let initial = (day_timestamp % 86_400) * 1_000_000_000;
                let upstream = 400_000 + jitter(&mut state);
                let downstream = 400_000 + jitter(&mut state);
                Observation {
                    day_timestamp,
                    packet_type: PacketType::Short,
                    packet_size: 64,
                    initial_timestamp: initial,
                    reception_timestamp: initial + upstream,
                    sent_timestamp: initial + upstream + 50_000,
                    final_timestamp: initial + upstream + 50_000 + downstream,
                }
            })
            .collect()
    }

    fn report_body(observations: Vec<Observation>) -> Vec<u8> {
        let report = Report {
            from_endpoint: "203.0.113.9:33001".to_string(),
            to_endpoint: "198.51.100.7:4500".to_string(),
            packet_type: PacketType::Short,
            initial_timestamp: 0,
            received_timestamp: 0,
            sent_timestamp: 0,
            final_timestamp: 0,
            public_key: "pk".to_string(),
            observations,
            signature: "sig".to_string(),
            user_id: 7,
            installation_id: 3,
        };
        encode_reports(&[report]).unwrap().into_bytes()
    }

    #[tokio::test]
    async fn well_formed_batch_is_posted_and_acked() {
        let sink = StubSink::new(vec![Ok(())]);
        let body = report_body(analyzable_observations());
        let disposition = process_message(&body, &sink).await;
        assert_eq!(disposition, Disposition::Ack);

        let posted = sink.posted();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].ip_address, "203.0.113.9");
        assert_eq!(posted[0].timestamp, 1_700_000_000 + 1799);
    }

    #[tokio::test]
    async fn poison_body_is_rejected_without_requeue() {
        let sink = StubSink::new(vec![]);
        let body = br#"[{"from":"a:1","to":"b:2","type":"X"}]"#;
        let disposition = process_message(body, &sink).await;
        assert_eq!(disposition, Disposition::Reject { requeue: false });
        assert!(sink.posted().is_empty());
    }

    #[tokio::test]
    async fn empty_batch_is_rejected_without_requeue() {
        let sink = StubSink::new(vec![]);
        let disposition = process_message(b"[]", &sink).await;
        assert_eq!(disposition, Disposition::Reject { requeue: false });
        assert!(sink.posted().is_empty());
    }

    #[tokio::test]
    async fn short_span_is_rejected_without_requeue() {
        let sink = StubSink::new(vec![]);
        let mut observations = analyzable_observations();
        observations.truncate(300);
        let body = report_body(observations);
        let disposition = process_message(&body, &sink).await;
        assert_eq!(disposition, Disposition::Reject { requeue: false });
        assert!(sink.posted().is_empty());
    }

    #[tokio::test]
    async fn transient_egress_failure_requeues_then_acks_on_retry() {
        let sink = StubSink::new(vec![Err(EgressError::Status { status: 503 }), Ok(())]);
        let body = report_body(analyzable_observations());

        let first = process_message(&body, &sink).await;
        assert_eq!(first, Disposition::Reject { requeue: true });
        assert!(sink.posted().is_empty());

        let second = process_message(&body, &sink).await;
        assert_eq!(second, Disposition::Ack);
        assert_eq!(sink.posted().len(), 1);
    }

    #[tokio::test]
    async fn missing_credentials_requeue() {
        let sink = StubSink::new(vec![Err(EgressError::MissingCredentials)]);
        let body = report_body(analyzable_observations());
        let disposition = process_message(&body, &sink).await;
        assert_eq!(disposition, Disposition::Reject { requeue: true });
    }

    #[test]
    fn failure_classes_map_to_the_requeue_policy() {
        use tix_processor_core::{AnalysisError, HistogramError, HurstError};

        use super::FailureClass;

        let poison = [
            FailureClass::of_analysis(&AnalysisError::NoShortObservations),
            FailureClass::of_analysis(&AnalysisError::DegenerateHistogram(
                HistogramError::TooFewDatapoints { count: 3 },
            )),
            FailureClass::of_analysis(&AnalysisError::DegenerateHistogram(
                HistogramError::ZeroWidthBin { index: 0 },
            )),
            FailureClass::of_analysis(&AnalysisError::InsufficientSpan {
                got_seconds: 599,
                window_seconds: 600,
            }),
            FailureClass::of_analysis(&AnalysisError::Hurst(HurstError::ConstantSeries)),
        ];
        for class in poison {
            assert!(!class.requeue(), "{} should be poison", class.as_str());
        }

        let recoverable = [
            FailureClass::of_egress(&EgressError::MissingCredentials),
            FailureClass::of_egress(&EgressError::Status { status: 503 }),
            FailureClass::of_egress(&EgressError::Transport("reset".to_string())),
        ];
        for class in recoverable {
            assert!(class.requeue(), "{} should requeue", class.as_str());
        }

        for status in [401, 403] {
            let class = FailureClass::of_egress(&EgressError::Status { status });
            assert_eq!(class, FailureClass::Configuration);
            assert!(class.requeue());
        }
        assert_eq!(
            FailureClass::of_egress(&EgressError::Status { status: 404 }),
            FailureClass::TransientEgress
        );
    }
}
