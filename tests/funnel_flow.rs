//! End-to-end wizard flows against a libSQL-backed durable store.

use std::path::Path;
use std::sync::Arc;

use lead_funnel::abandonment::LifecycleSignal;
use lead_funnel::config::{FunnelConfig, ServiceType};
use lead_funnel::engagement::ScrollSource;
use lead_funnel::events::{event_channel, EventName, EventReceiver, EventRecord};
use lead_funnel::funnel::model::{ChoiceField, ToggleField};
use lead_funnel::funnel::{Funnel, HeadlessPresenter, Signal, StepIndex, Stores, WizardState};
use lead_funnel::store::{keys, LibSqlStore, KeyValueStore, MemoryStore, ProgressStore};
use lead_funnel::tiering::Tier;

fn open(path: &Path, service: ServiceType) -> (Funnel<HeadlessPresenter>, EventReceiver) {
    let config = FunnelConfig {
        service,
        utm_query: "utm_source=google&utm_medium=cpc&utm_campaign=implantes".into(),
        store_path: path.to_path_buf(),
        ..FunnelConfig::default()
    };
    let stores = Stores {
        ephemeral: Arc::new(MemoryStore::new()) as Arc<dyn KeyValueStore>,
        durable: Arc::new(LibSqlStore::open(path).unwrap()) as Arc<dyn KeyValueStore>,
    };
    let (tx, rx) = event_channel();
    let funnel = Funnel::load(&config, stores, HeadlessPresenter::new(), tx);
    (funnel, rx)
}

fn names(events: &[EventRecord]) -> Vec<EventName> {
    events.iter().map(|e| e.event).collect()
}

fn count(events: &[EventRecord], name: EventName) -> usize {
    events.iter().filter(|e| e.event == name).count()
}

fn answer_everything(funnel: &mut Funnel<HeadlessPresenter>) {
    let p = funnel.presenter_mut();
    p.type_name("Camila");
    p.pick(ChoiceField::PrimaryGoal, "piezas_faltantes");
    p.pick(ChoiceField::Timeline, "este_mes");
    p.pick(ChoiceField::Priority, "alta");
    p.pick(ChoiceField::InvestmentRange, "6000_12000");
    p.set_checkbox(ToggleField::AcceptedConditions, true);
    p.set_checkbox(ToggleField::WhatsappOptIn, true);
}

#[test]
fn empty_name_stays_on_first_step() {
    let dir = tempfile::tempdir().unwrap();
    let (mut funnel, mut rx) = open(&dir.path().join("store.db"), ServiceType::Implants);
    rx.drain();

    funnel.handle(Signal::Next);

    let events = rx.drain();
    assert_eq!(names(&events), [EventName::FormValidationError]);
    assert_eq!(events[0].payload["field"], "first_name");
    assert_eq!(funnel.state(), WizardState::Step(StepIndex::FIRST));
}

#[test]
fn full_qualified_flow() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");
    let (mut funnel, mut rx) = open(&path, ServiceType::Implants);
    answer_everything(&mut funnel);

    for _ in 0..5 {
        funnel.handle(Signal::Next);
    }
    funnel.handle(Signal::Submit);
    funnel.handle(Signal::Submit);
    funnel.handle(Signal::WhatsappClick);
    funnel.handle(Signal::Lifecycle(LifecycleSignal::PageHide));

    let events = rx.drain();
    assert_eq!(count(&events, EventName::PageView), 1);
    assert_eq!(count(&events, EventName::FormStart), 1);
    assert_eq!(count(&events, EventName::FormStep), 6);
    assert_eq!(count(&events, EventName::FormSubmit), 1);
    assert_eq!(count(&events, EventName::FormAbandon), 0);

    let tail: Vec<_> = names(&events).into_iter().skip_while(|n| *n != EventName::FormSubmit).collect();
    assert_eq!(
        tail,
        [EventName::FormSubmit, EventName::QualifiedLead, EventName::WhatsappRedirect]
    );

    let start = events.iter().position(|e| e.event == EventName::FormStart).unwrap();
    assert_eq!(events[start + 1].event, EventName::FormStep);
    assert_eq!(events[start + 1].payload["step_index"], 2);

    for e in &events {
        assert_eq!(e.lead_id, funnel.identity().lead_id);
        assert_eq!(e.attribution.utm_campaign, "implantes");
        assert_eq!(e.attribution.experiment_variant, "v1");
    }

    let outcome = funnel.outcome().unwrap();
    assert_eq!(outcome.decision.tier, Tier::A);
    assert_eq!(funnel.state(), WizardState::Qualified);

    // Persisted state after submit, read back from disk.
    let reopened = LibSqlStore::open(&path).unwrap();
    assert!(reopened.get(keys::CURRENT_STEP).unwrap().is_none());
    assert!(reopened.get(keys::FORM_STARTED).unwrap().is_none());
    assert!(reopened.get(keys::FORM_DATA).unwrap().is_none());
    assert_eq!(
        reopened.get(keys::LEAD_ID).unwrap().as_deref(),
        Some(funnel.identity().lead_id.as_str())
    );
    let receipt = ProgressStore::new(Arc::new(reopened))
        .load_receipt()
        .unwrap()
        .unwrap();
    assert_eq!(receipt.short_id, outcome.receipt.short_id);
    assert_eq!(receipt.lead_tier, Tier::A);
    assert!(receipt.is_qualified);
    assert_eq!(receipt.attribution.utm_source, "google");
}

#[test]
fn reload_resumes_without_revalidation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");

    {
        let (mut funnel, _rx) = open(&path, ServiceType::Implants);
        answer_everything(&mut funnel);
        for _ in 0..3 {
            funnel.handle(Signal::Next);
        }
        assert_eq!(funnel.state(), WizardState::Step(StepIndex::new(4).unwrap()));
    }

    let (mut funnel, mut rx) = open(&path, ServiceType::Implants);
    assert_eq!(funnel.state(), WizardState::Step(StepIndex::new(4).unwrap()));
    assert_eq!(funnel.presenter().name, "Camila");
    assert_eq!(
        funnel.presenter().choices.get(&ChoiceField::Timeline).map(String::as_str),
        Some("este_mes")
    );
    let events = rx.drain();
    assert_eq!(names(&events), [EventName::PageView, EventName::FormStep]);
    assert_eq!(events[1].payload["step_index"], 4);

    // Already started in the previous load.
    funnel.handle(Signal::Next);
    assert_eq!(count(&rx.drain(), EventName::FormStart), 0);
}

#[test]
fn view_content_fires_once() {
    let dir = tempfile::tempdir().unwrap();
    let (mut funnel, mut rx) = open(&dir.path().join("store.db"), ServiceType::Aesthetic);
    rx.drain();

    funnel.handle(Signal::ScrollProgress {
        ratio: 0.3,
        source: ScrollSource::SmoothScroll,
    });
    funnel.handle(Signal::DwellElapsed);
    funnel.handle(Signal::ScrollProgress {
        ratio: 0.9,
        source: ScrollSource::Native,
    });

    let events = rx.drain();
    assert_eq!(names(&events), [EventName::ViewContent]);
    assert_eq!(events[0].payload["engagement_type"], "time_15s");
}

#[test]
fn abandonment_reported_once_after_start() {
    let dir = tempfile::tempdir().unwrap();
    let (mut funnel, mut rx) = open(&dir.path().join("store.db"), ServiceType::Implants);

    // Not started yet.
    funnel.handle(Signal::Lifecycle(LifecycleSignal::VisibilityHidden));
    assert_eq!(count(&rx.drain(), EventName::FormAbandon), 0);

    answer_everything(&mut funnel);
    funnel.handle(Signal::Next);
    funnel.handle(Signal::Next);
    funnel.handle(Signal::Lifecycle(LifecycleSignal::VisibilityHidden));
    funnel.handle(Signal::Lifecycle(LifecycleSignal::VisibilityVisible));
    funnel.handle(Signal::Lifecycle(LifecycleSignal::PageHide));

    let events = rx.drain();
    let abandons: Vec<_> = events
        .iter()
        .filter(|e| e.event == EventName::FormAbandon)
        .collect();
    assert_eq!(abandons.len(), 1);
    let payload = &abandons[0].payload;
    assert_eq!(payload["last_step"], 3);
    assert_eq!(payload["total_steps"], 6);
    assert_eq!(payload["primary_goal"], "piezas_faltantes");
    assert!(payload["elapsed_time_seconds"].as_i64().unwrap() >= 0);
}

#[test]
fn not_qualified_lead_gets_no_link() {
    let dir = tempfile::tempdir().unwrap();
    let (mut funnel, mut rx) = open(&dir.path().join("store.db"), ServiceType::Implants);
    answer_everything(&mut funnel);
    funnel
        .presenter_mut()
        .set_checkbox(ToggleField::AcceptedConditions, false);

    for _ in 0..5 {
        funnel.handle(Signal::Next);
    }
    funnel.handle(Signal::Submit);
    funnel.handle(Signal::WhatsappClick);

    let events = rx.drain();
    assert_eq!(count(&events, EventName::FormSubmit), 1);
    assert_eq!(count(&events, EventName::QualifiedLead), 0);
    assert_eq!(count(&events, EventName::WhatsappRedirect), 0);
    assert_eq!(funnel.state(), WizardState::NotQualified);
    assert!(funnel.outcome().unwrap().whatsapp_link.is_none());
}
