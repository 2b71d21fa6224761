//! The funnel session: one page load of the qualification wizard.
//!
//! Owns identity, the navigator, the one-shot trackers, and the outbound
//! link. Inputs arrive as [`Signal`]s; failures are logged and never
//! escape [`Funnel::handle`].

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::abandonment::{AbandonmentDetector, LifecycleSignal, ProgressSnapshot};
use crate::config::{FunnelConfig, ServiceConfig};
use crate::engagement::{EngagementTracker, ScrollSource};
use crate::error::{NavigationError, PresentationError};
use crate::events::{AttributionContext, EventEmitter, EventName, EventSender};
use crate::identity::{short_id, SessionIdentity};
use crate::outbound::{whatsapp_link, whatsapp_message};
use crate::store::{KeyValueStore, ProgressStore};
use crate::tiering::TierDecision;

use super::model::{StepIndex, SubmissionReceipt};
use super::navigator::{StepNavigator, WizardState};
use super::presenter::{Presenter, ResultView};

/// Ephemeral (per-session) and durable (per-device) storage tiers.
#[derive(Clone)]
pub struct Stores {
    pub ephemeral: Arc<dyn KeyValueStore>,
    pub durable: Arc<dyn KeyValueStore>,
}

/// Inputs from the presentation layer and the host environment.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Next,
    Prev,
    Submit,
    CtaClick { cta_id: String },
    ScrollProgress { ratio: f64, source: ScrollSource },
    DwellElapsed,
    WhatsappClick,
    Lifecycle(LifecycleSignal),
}

/// What a completed submission produced.
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub decision: TierDecision,
    pub receipt: SubmissionReceipt,
    pub whatsapp_link: Option<String>,
}

pub struct Funnel<P: Presenter> {
    service: ServiceConfig,
    whatsapp_number: String,
    emitter: EventEmitter,
    presenter: P,
    navigator: StepNavigator,
    engagement: EngagementTracker,
    abandonment: AbandonmentDetector,
    outcome: Option<SubmissionOutcome>,
}

impl<P: Presenter> Funnel<P> {
    /// Start a page load: resolve identity, emit `page_view`, restore progress.
    ///
    /// Store failures are logged; the session still loads.
    pub fn load(
        config: &FunnelConfig,
        stores: Stores,
        mut presenter: P,
        events: EventSender,
    ) -> Self {
        let identity =
            SessionIdentity::load_or_generate(stores.ephemeral.as_ref(), stores.durable.as_ref());
        let attribution =
            AttributionContext::from_query(&config.utm_query, &config.experiment_variant);
        let service = config.service_config();

        info!(
            service = %service.service,
            lead_id = %identity.lead_id,
            campaign = attribution.has_campaign(),
            "Funnel loaded"
        );

        let emitter = EventEmitter::new(identity, attribution, events);
        emitter.emit_bare(EventName::PageView);

        let progress = ProgressStore::new(stores.durable);
        let navigator = StepNavigator::restore(progress, &mut presenter, &emitter);

        Self {
            service,
            whatsapp_number: config.whatsapp_number.clone(),
            emitter,
            presenter,
            navigator,
            engagement: EngagementTracker::new(),
            abandonment: AbandonmentDetector::new(),
            outcome: None,
        }
    }

    /// Dispatch one signal. Errors are logged, never returned.
    pub fn handle(&mut self, signal: Signal) {
        match signal {
            Signal::Next => {
                if let Err(e) = self.next() {
                    log_navigation_error("next", &e);
                }
            }
            Signal::Prev => {
                if let Err(e) = self.prev() {
                    log_navigation_error("prev", &e);
                }
            }
            Signal::Submit => {
                if let Err(e) = self.submit() {
                    log_navigation_error("submit", &e);
                }
            }
            Signal::CtaClick { cta_id } => self.cta_click(&cta_id),
            Signal::ScrollProgress { ratio, source } => {
                self.scroll_progress(ratio, source);
            }
            Signal::DwellElapsed => {
                self.dwell_elapsed();
            }
            Signal::WhatsappClick => {
                self.whatsapp_click();
            }
            Signal::Lifecycle(signal) => {
                self.lifecycle(signal);
            }
        }
    }

    pub fn next(&mut self) -> Result<StepIndex, NavigationError> {
        self.navigator.next(&mut self.presenter, &self.emitter)
    }

    pub fn prev(&mut self) -> Result<StepIndex, NavigationError> {
        self.navigator.prev(&mut self.presenter, &self.emitter)
    }

    /// Submit from the last step.
    ///
    /// The receipt is written and progress cleared before `form_submit`
    /// (and `qualified_lead`) go out.
    pub fn submit(&mut self) -> Result<&SubmissionOutcome, NavigationError> {
        let decision =
            self.navigator
                .submit(self.service.policy, &mut self.presenter, &self.emitter)?;
        let answers = self.navigator.answers().clone();
        let identity = self.emitter.identity();

        let receipt = SubmissionReceipt {
            timestamp: Utc::now(),
            short_id: short_id(),
            lead_tier: decision.tier,
            is_qualified: decision.is_qualified(),
            primary_goal: answers.primary_goal.clone(),
            timeline: answers.timeline.clone(),
            priority: answers.priority.clone(),
            investment_range: answers.investment_range.clone(),
            session_id: identity.session_id.clone(),
            lead_id: identity.lead_id.clone(),
            attribution: self.emitter.attribution().clone(),
        };

        let progress = self.progress();
        if let Err(e) = progress.save_receipt(&receipt) {
            error!(error = %e, "Failed to store submission receipt");
        }
        if let Err(e) = self.navigator.clear_progress() {
            error!(error = %e, "Failed to clear form progress");
        }

        let payload = json!({
            "lead_tier": decision.tier,
            "is_qualified": decision.is_qualified(),
            "investment_range": answers.investment_range,
            "priority": answers.priority,
            "timeline": answers.timeline,
        });
        self.emitter.emit(EventName::FormSubmit, payload.clone());
        if decision.is_qualified() {
            self.emitter.emit(EventName::QualifiedLead, payload);
        }

        let link = if decision.is_qualified() {
            let message = whatsapp_message(&self.service, &answers, &receipt.short_id);
            match whatsapp_link(&self.whatsapp_number, &message) {
                Ok(link) => Some(link),
                Err(e) => {
                    warn!(error = %e, number = %self.whatsapp_number, "Could not build WhatsApp link");
                    None
                }
            }
        } else {
            None
        };

        let view = if decision.is_qualified() {
            ResultView::Qualified {
                first_name: answers.trimmed_name().to_string(),
                message: self.service.result_message.to_string(),
                whatsapp_link: link.clone(),
            }
        } else {
            ResultView::NotQualified
        };
        match self.presenter.show_result(view) {
            Ok(()) => {}
            Err(PresentationError::MissingElement(element)) => {
                debug!(element, "Result element missing, skipped");
            }
            Err(e) => warn!(error = %e, "Could not show result"),
        }

        info!(
            tier = %decision.tier,
            short_id = %receipt.short_id,
            qualified = decision.is_qualified(),
            "Submission complete"
        );

        Ok(&*self.outcome.insert(SubmissionOutcome {
            decision,
            receipt,
            whatsapp_link: link,
        }))
    }

    /// A call-to-action element was clicked.
    pub fn cta_click(&mut self, cta_id: &str) {
        debug!(cta_id, "CTA clicked");
        self.emitter
            .emit(EventName::CtaClick, json!({ "cta_id": cta_id }));
    }

    pub fn scroll_progress(&mut self, ratio: f64, source: ScrollSource) -> bool {
        self.engagement
            .on_scroll_progress(ratio, source, &self.emitter)
    }

    pub fn dwell_elapsed(&mut self) -> bool {
        self.engagement.on_dwell_elapsed(&self.emitter)
    }

    /// The outbound WhatsApp link was followed.
    ///
    /// Only reported after a qualified submission.
    pub fn whatsapp_click(&mut self) -> bool {
        let Some(outcome) = self
            .outcome
            .as_ref()
            .filter(|o| o.decision.is_qualified())
        else {
            debug!("WhatsApp click without a qualified submission");
            return false;
        };

        self.emitter.emit(
            EventName::WhatsappRedirect,
            json!({
                "lead_tier": outcome.decision.tier,
                "service": self.service.service,
                "lead_id_short": outcome.receipt.short_id,
                "is_qualified": true,
            }),
        );
        info!(tier = %outcome.decision.tier, "WhatsApp redirect");
        true
    }

    /// Page visibility or teardown changed.
    pub fn lifecycle(&mut self, signal: LifecycleSignal) -> bool {
        let snapshot = ProgressSnapshot {
            started: self.navigator.form_started(),
            submitted: self.navigator.is_submitted(),
            last_step: self.navigator.last_step(),
            start_time_ms: self.navigator.form_start_time(),
            answers: self.navigator.answers(),
        };
        self.abandonment.on_signal(
            signal,
            snapshot,
            Utc::now().timestamp_millis(),
            &self.emitter,
        )
    }

    pub fn state(&self) -> WizardState {
        self.navigator.state()
    }

    pub fn navigator(&self) -> &StepNavigator {
        &self.navigator
    }

    pub fn identity(&self) -> &SessionIdentity {
        self.emitter.identity()
    }

    pub fn service(&self) -> &ServiceConfig {
        &self.service
    }

    pub fn outcome(&self) -> Option<&SubmissionOutcome> {
        self.outcome.as_ref()
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    fn progress(&self) -> &ProgressStore {
        self.navigator.progress()
    }
}

fn log_navigation_error(action: &str, err: &NavigationError) {
    match err {
        NavigationError::Blocked(_) => debug!(action, error = %err, "Transition blocked"),
        NavigationError::InvalidTransition { .. } => {
            debug!(action, error = %err, "Transition ignored")
        }
        NavigationError::MissingTargetStep(_) | NavigationError::Store(_) => {
            error!(action, error = %err, "Transition failed")
        }
    }
}
