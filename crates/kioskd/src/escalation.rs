//! Escalation controller.
//!
//! The per-call analysis pipeline: short-circuit on an existing live
//! ticket, classify, then route by category. Video and audio problems
//! race an automatic diagnosis against the escalation timer; whichever
//! settles first decides, and the loser is dropped. Escalation itself
//! is guarded by a single process-wide slot so two kiosk taps cannot
//! create tickets concurrently.

use crate::backend::{DiagnosisRequest, SupportBackend};
use crate::ticket_store::{CreateResult, TicketStore};
use chrono::Utc;
use kiosk_common::classify::{classify, ProblemCategory, ProblemClassification};
use kiosk_common::config::TimeoutConfig;
use kiosk_common::outcome::{
    AnalysisOutcome, EscalationReason, ServiceDesk, GREETING_MESSAGE, OUT_OF_SCOPE_MESSAGE,
};
use kiosk_common::ticket::TicketRequest;
use kiosk_common::{KioskError, RoomId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// What one analyze call produced.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub classification: ProblemClassification,
    pub outcome: AnalysisOutcome,
}

pub struct EscalationController {
    backend: Arc<dyn SupportBackend>,
    tickets: Arc<TicketStore>,
    escalation_delay: Duration,
    diagnosis_timeout: Duration,
    /// Single escalation slot; busy means EscalationInProgress.
    escalating: Mutex<()>,
}

impl EscalationController {
    pub fn new(
        backend: Arc<dyn SupportBackend>,
        tickets: Arc<TicketStore>,
        timeouts: &TimeoutConfig,
    ) -> Self {
        Self {
            backend,
            tickets,
            escalation_delay: timeouts.escalation_delay(),
            diagnosis_timeout: timeouts.diagnosis_timeout(),
            escalating: Mutex::new(()),
        }
    }

    /// Run the full pipeline for one report. Exactly one outcome is
    /// produced; backend failures during ticket creation are the only
    /// errors that escape.
    pub async fn analyze(
        &self,
        room: &RoomId,
        message: &str,
    ) -> Result<AnalysisReport, KioskError> {
        if let Some(ticket) = self.tickets.live_for_room(room).await {
            info!("Room {} already covered by ticket {}", room, ticket.number);
            return Ok(AnalysisReport {
                classification: classify(message),
                outcome: AnalysisOutcome::ExistingTicket { ticket },
            });
        }

        let classification = classify(message);
        info!(
            "Classified report for {} as {} (confidence {:.2})",
            room, classification.category, classification.confidence
        );

        let outcome = match classification.category {
            ProblemCategory::Greeting => AnalysisOutcome::Greeting {
                message: GREETING_MESSAGE.to_string(),
            },
            ProblemCategory::OutOfScope => AnalysisOutcome::OutOfScope {
                message: OUT_OF_SCOPE_MESSAGE.to_string(),
            },
            ProblemCategory::NonAudiovisual => redirect(ServiceDesk::Building),
            ProblemCategory::Network => redirect(ServiceDesk::It),
            ProblemCategory::GenericTechnical | ProblemCategory::Unknown => {
                self.escalate(
                    room,
                    &classification,
                    message,
                    EscalationReason::DirectEscalation,
                )
                .await?
            }
            ProblemCategory::Video | ProblemCategory::Audio => {
                self.race_diagnosis(room, &classification, message).await?
            }
        };

        info!("Report for {} resolved as {}", room, outcome.label());
        Ok(AnalysisReport {
            classification,
            outcome,
        })
    }

    /// Race the diagnosis call against the escalation timer. The timer
    /// winning drops the in-flight diagnosis, so a late diagnosis has
    /// no observable effect.
    async fn race_diagnosis(
        &self,
        room: &RoomId,
        classification: &ProblemClassification,
        message: &str,
    ) -> Result<AnalysisOutcome, KioskError> {
        let request = DiagnosisRequest {
            room: room.clone(),
            message: message.to_string(),
            problem_type: classification.category.to_string(),
            timestamp: Utc::now(),
        };
        let diagnosis = tokio::time::timeout(self.diagnosis_timeout, self.backend.diagnose(&request));

        tokio::select! {
            _ = tokio::time::sleep(self.escalation_delay) => {
                info!("Escalation timer fired before diagnosis for {}", room);
                self.escalate(room, classification, message, EscalationReason::TimedOut)
                    .await
            }
            settled = diagnosis => match settled {
                Ok(Ok(response)) if response.auto_executed => {
                    info!("Automatic fix executed for {}", room);
                    Ok(AnalysisOutcome::AutoResolved {
                        message: response.auto_result.unwrap_or_else(|| {
                            "Le problème a été corrigé automatiquement.".to_string()
                        }),
                    })
                }
                Ok(Ok(_)) => {
                    self.escalate(
                        room,
                        classification,
                        message,
                        EscalationReason::NoAutomaticFix,
                    )
                    .await
                }
                Ok(Err(e)) => {
                    warn!("Diagnosis failed for {}: {}", room, e);
                    self.escalate(
                        room,
                        classification,
                        message,
                        EscalationReason::DiagnosisFailed,
                    )
                    .await
                }
                Err(_) => {
                    warn!("Diagnosis timed out for {}", room);
                    self.escalate(
                        room,
                        classification,
                        message,
                        EscalationReason::DiagnosisFailed,
                    )
                    .await
                }
            },
        }
    }

    /// Create a ticket under the escalation slot. A busy slot or an
    /// in-flight creation lands on EscalationInProgress instead of an
    /// error so the kiosk shows a wait message rather than a failure.
    async fn escalate(
        &self,
        room: &RoomId,
        classification: &ProblemClassification,
        message: &str,
        reason: EscalationReason,
    ) -> Result<AnalysisOutcome, KioskError> {
        if let Some(ticket) = self.tickets.live_for_room(room).await {
            return Ok(AnalysisOutcome::ExistingTicket { ticket });
        }

        let _slot = match self.escalating.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                info!("Escalation slot busy, deferring {}", room);
                return Ok(AnalysisOutcome::EscalationInProgress);
            }
        };

        let request = TicketRequest::new(room.clone(), classification.category, message);
        match self.tickets.create(&request).await {
            Ok(CreateResult::Created(ticket)) => {
                info!(
                    "Escalated {} for room {} ({})",
                    ticket.number, room, reason
                );
                Ok(AnalysisOutcome::Escalated {
                    ticket,
                    category: classification.category,
                    reason,
                })
            }
            Ok(CreateResult::Existing(ticket)) => Ok(AnalysisOutcome::ExistingTicket { ticket }),
            Err(KioskError::AlreadyCreating) => Ok(AnalysisOutcome::EscalationInProgress),
            Err(e) => Err(e),
        }
    }

    /// Whether an escalation currently holds the slot.
    pub fn is_escalating(&self) -> bool {
        match self.escalating.try_lock() {
            Ok(_guard) => false,
            Err(_) => true,
        }
    }
}

fn redirect(service: ServiceDesk) -> AnalysisOutcome {
    AnalysisOutcome::Redirected {
        message: service.redirect_message(),
        service,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{
        BackendTicket, CreateTicketRequest, CreateTicketResponse, DiagnosisResponse,
        EquipmentResponse,
    };
    use crate::room_cache::RoomCache;
    use async_trait::async_trait;
    use kiosk_common::session::SessionStore;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Copy)]
    enum DiagnosisBehavior {
        AutoFix,
        NoFix,
        Fail,
        /// Answers with an auto-fix, but only after the given delay.
        SlowAutoFix(Duration),
    }

    struct StubBackend {
        diagnosis: DiagnosisBehavior,
        create_delay: Duration,
        diagnose_calls: AtomicUsize,
        create_calls: AtomicUsize,
    }

    impl StubBackend {
        fn new(diagnosis: DiagnosisBehavior) -> Self {
            Self {
                diagnosis,
                create_delay: Duration::ZERO,
                diagnose_calls: AtomicUsize::new(0),
                create_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SupportBackend for StubBackend {
        async fn diagnose(&self, _: &DiagnosisRequest) -> Result<DiagnosisResponse, KioskError> {
            self.diagnose_calls.fetch_add(1, Ordering::SeqCst);
            match self.diagnosis {
                DiagnosisBehavior::AutoFix => Ok(DiagnosisResponse {
                    auto_executed: true,
                    auto_result: Some("Projecteur redémarré.".to_string()),
                }),
                DiagnosisBehavior::NoFix => Ok(DiagnosisResponse {
                    auto_executed: false,
                    auto_result: None,
                }),
                DiagnosisBehavior::Fail => Err(KioskError::Network("backend down".into())),
                DiagnosisBehavior::SlowAutoFix(delay) => {
                    tokio::time::sleep(delay).await;
                    Ok(DiagnosisResponse {
                        auto_executed: true,
                        auto_result: Some("tard".to_string()),
                    })
                }
            }
        }

        async fn create_ticket(
            &self,
            _: &CreateTicketRequest,
        ) -> Result<CreateTicketResponse, KioskError> {
            let n = self.create_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.create_delay).await;
            Ok(CreateTicketResponse {
                success: true,
                ticket: Some(BackendTicket {
                    id: Some(format!("id-{}", n)),
                    number: Some(format!("SEA-20260829-{:04}", n)),
                    status: Some("nouveau".to_string()),
                }),
                message: None,
            })
        }

        async fn room_info(&self, room: &RoomId) -> Result<Value, KioskError> {
            Ok(serde_json::json!({ "salle": room.as_str() }))
        }

        async fn room_equipment(&self, _: &RoomId) -> Result<EquipmentResponse, KioskError> {
            Err(KioskError::Network("unused".into()))
        }
    }

    fn controller_with(
        backend: Arc<StubBackend>,
    ) -> (EscalationController, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let session = SessionStore::new(dir.path().join("session.json"));
        let cache = Arc::new(RoomCache::new(
            backend.clone() as Arc<dyn SupportBackend>,
            session.clone(),
        ));
        let tickets = Arc::new(TicketStore::new(
            backend.clone() as Arc<dyn SupportBackend>,
            cache,
            session,
        ));
        (
            EscalationController::new(backend, tickets, &TimeoutConfig::default()),
            dir,
        )
    }

    fn room() -> RoomId {
        RoomId::parse("B-2200").unwrap()
    }

    #[tokio::test]
    async fn test_greeting_has_no_side_effects() {
        let backend = Arc::new(StubBackend::new(DiagnosisBehavior::AutoFix));
        let (controller, _dir) = controller_with(backend.clone());

        let report = controller.analyze(&room(), "bonjour").await.unwrap();
        assert!(matches!(report.outcome, AnalysisOutcome::Greeting { .. }));
        assert_eq!(backend.diagnose_calls.load(Ordering::SeqCst), 0);
        assert_eq!(backend.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_building_problem_redirects_without_ticket() {
        let backend = Arc::new(StubBackend::new(DiagnosisBehavior::AutoFix));
        let (controller, _dir) = controller_with(backend.clone());

        let report = controller
            .analyze(&room(), "le chauffage ne fonctionne pas du tout")
            .await
            .unwrap();
        match report.outcome {
            AnalysisOutcome::Redirected { service, message } => {
                assert_eq!(service, ServiceDesk::Building);
                assert!(message.contains("6100"));
            }
            other => panic!("expected redirect, got {}", other.label()),
        }
        assert_eq!(backend.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_autofix_resolves_without_ticket() {
        let backend = Arc::new(StubBackend::new(DiagnosisBehavior::AutoFix));
        let (controller, _dir) = controller_with(backend.clone());

        let report = controller
            .analyze(&room(), "le projecteur ne s'allume pas du tout")
            .await
            .unwrap();
        match report.outcome {
            AnalysisOutcome::AutoResolved { message } => {
                assert_eq!(message, "Projecteur redémarré.");
            }
            other => panic!("expected auto-resolution, got {}", other.label()),
        }
        assert_eq!(backend.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_fix_escalates_with_ticket() {
        let backend = Arc::new(StubBackend::new(DiagnosisBehavior::NoFix));
        let (controller, _dir) = controller_with(backend.clone());

        let report = controller
            .analyze(&room(), "aucun son ne sort des haut-parleurs")
            .await
            .unwrap();
        match report.outcome {
            AnalysisOutcome::Escalated {
                category, reason, ..
            } => {
                assert_eq!(category, ProblemCategory::Audio);
                assert_eq!(reason, EscalationReason::NoAutomaticFix);
            }
            other => panic!("expected escalation, got {}", other.label()),
        }
        assert_eq!(backend.create_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_diagnosis_loses_to_timer() {
        // Diagnosis would auto-fix after 5 s, but the 2 s timer wins
        // and the late result is dropped.
        let backend = Arc::new(StubBackend::new(DiagnosisBehavior::SlowAutoFix(
            Duration::from_secs(5),
        )));
        let (controller, _dir) = controller_with(backend.clone());

        let report = controller
            .analyze(&room(), "le projecteur ne s'allume pas du tout")
            .await
            .unwrap();
        match report.outcome {
            AnalysisOutcome::Escalated { reason, .. } => {
                assert_eq!(reason, EscalationReason::TimedOut);
            }
            other => panic!("expected timer escalation, got {}", other.label()),
        }
        assert_eq!(backend.create_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_diagnosis_failure_escalates() {
        let backend = Arc::new(StubBackend::new(DiagnosisBehavior::Fail));
        let (controller, _dir) = controller_with(backend.clone());

        let report = controller
            .analyze(&room(), "l'écran reste complètement noir")
            .await
            .unwrap();
        match report.outcome {
            AnalysisOutcome::Escalated { reason, .. } => {
                assert_eq!(reason, EscalationReason::DiagnosisFailed);
            }
            other => panic!("expected escalation, got {}", other.label()),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_generic_problem_escalates_directly() {
        let backend = Arc::new(StubBackend::new(DiagnosisBehavior::AutoFix));
        let (controller, _dir) = controller_with(backend.clone());

        let report = controller
            .analyze(&room(), "quelque chose est cassé dans la salle")
            .await
            .unwrap();
        match report.outcome {
            AnalysisOutcome::Escalated {
                category, reason, ..
            } => {
                assert_eq!(category, ProblemCategory::GenericTechnical);
                assert_eq!(reason, EscalationReason::DirectEscalation);
            }
            other => panic!("expected escalation, got {}", other.label()),
        }
        // Direct escalation never attempts a diagnosis.
        assert_eq!(backend.diagnose_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_report_returns_existing_ticket() {
        let backend = Arc::new(StubBackend::new(DiagnosisBehavior::NoFix));
        let (controller, _dir) = controller_with(backend.clone());

        let first = controller
            .analyze(&room(), "aucun son ne sort des haut-parleurs")
            .await
            .unwrap();
        let created = match first.outcome {
            AnalysisOutcome::Escalated { ticket, .. } => ticket,
            other => panic!("expected escalation, got {}", other.label()),
        };

        let second = controller
            .analyze(&room(), "le projecteur ne s'allume pas du tout")
            .await
            .unwrap();
        match second.outcome {
            AnalysisOutcome::ExistingTicket { ticket } => {
                assert_eq!(ticket.number, created.number);
            }
            other => panic!("expected existing ticket, got {}", other.label()),
        }
        assert_eq!(backend.create_calls.load(Ordering::SeqCst), 1);
        // The short-circuit happens before any diagnosis attempt.
        assert_eq!(backend.diagnose_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_escalations_share_one_slot() {
        let mut stub = StubBackend::new(DiagnosisBehavior::NoFix);
        stub.create_delay = Duration::from_millis(500);
        let backend = Arc::new(stub);
        let dir = tempfile::tempdir().unwrap();
        let session = SessionStore::new(dir.path().join("session.json"));
        let cache = Arc::new(RoomCache::new(
            backend.clone() as Arc<dyn SupportBackend>,
            session.clone(),
        ));
        let tickets = Arc::new(TicketStore::new(
            backend.clone() as Arc<dyn SupportBackend>,
            cache,
            session,
        ));
        let controller = Arc::new(EscalationController::new(
            backend.clone(),
            tickets,
            &TimeoutConfig::default(),
        ));

        let slow = {
            let controller = controller.clone();
            tokio::spawn(async move {
                controller
                    .analyze(
                        &RoomId::parse("B-2200").unwrap(),
                        "quelque chose est cassé dans la salle",
                    )
                    .await
            })
        };
        // Let the first escalation take the slot and reach the backend.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(controller.is_escalating());

        let second = controller
            .analyze(
                &RoomId::parse("C-3300").unwrap(),
                "quelque chose est cassé dans la salle",
            )
            .await
            .unwrap();
        assert!(matches!(
            second.outcome,
            AnalysisOutcome::EscalationInProgress
        ));

        let first = slow.await.unwrap().unwrap();
        assert!(matches!(first.outcome, AnalysisOutcome::Escalated { .. }));
        assert!(!controller.is_escalating());
        assert_eq!(backend.create_calls.load(Ordering::SeqCst), 1);
    }
}
