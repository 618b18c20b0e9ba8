use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use talent_pipeline::config::AppConfig;
use talent_pipeline::error::AppError;
use talent_pipeline::store::InMemoryStore;
use talent_pipeline::telemetry;
use talent_pipeline::workflows::assessments::{
    assessment_router, Answer, AssessmentKind, AssessmentService, AssessmentStore,
    AssessmentTemplate, ChoiceOption, Question, QuestionConfig, QuestionId, ScoringConfig,
    SubmittedAnswer, TemplateId,
};
use talent_pipeline::workflows::audit::{AuditSink, TracingAuditSink};
use talent_pipeline::workflows::pipeline::{
    NotificationSender, PipelineEngine, PipelineStore, Stage, TracingNotifier,
};
use talent_pipeline::workflows::webhook::{
    webhook_router, IntakeOutcome, WebhookAdapter, WebhookData, WebhookEnvelope, WebhookField,
};
use tracing::{info, warn};

const STALE_SWEEP_INTERVAL: Duration = Duration::from_secs(15 * 60);

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "Talent Pipeline",
    about = "Assessment scoring and hiring pipeline stage engine",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Walk one candidate through the pipeline on an in-memory store
    Demo,
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Demo => run_demo(),
    }
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let store = Arc::new(InMemoryStore::default());
    seed_templates(store.as_ref())?;

    let audit = Arc::new(TracingAuditSink);
    let notifier = Arc::new(TracingNotifier);
    let engine = Arc::new(PipelineEngine::new(
        store.clone(),
        audit.clone(),
        notifier.clone(),
    ));
    let service = Arc::new(AssessmentService::new(
        store.clone(),
        engine.clone(),
        audit.clone(),
        config.scoring,
    ));
    let adapter = Arc::new(WebhookAdapter::new(
        store.clone(),
        engine.clone(),
        audit.clone(),
        config.scoring,
    ));

    spawn_stale_sweeper(service.clone());

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .merge(assessment_router(service))
        .merge(webhook_router(adapter))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "talent pipeline service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Background sweep that expires in-progress sessions past the staleness
/// window.
fn spawn_stale_sweeper<S, P, A, N>(service: Arc<AssessmentService<S, P, A, N>>)
where
    S: AssessmentStore + 'static,
    P: PipelineStore + 'static,
    A: AuditSink + ?Sized + 'static,
    N: NotificationSender + ?Sized + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(STALE_SWEEP_INTERVAL);
        // interval fires immediately; skip the startup tick.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match service.expire_stale() {
                Ok(0) => {}
                Ok(expired) => info!(expired, "expired stale assessment sessions"),
                Err(err) => warn!(error = %err, "stale session sweep failed"),
            }
        }
    });
}

fn seed_templates<S: AssessmentStore>(store: &S) -> Result<(), AppError> {
    for template in default_templates() {
        store.put_template(template)?;
    }
    Ok(())
}

fn default_templates() -> Vec<AssessmentTemplate> {
    vec![
        AssessmentTemplate {
            id: TemplateId("general-competencies-v1".to_string()),
            kind: AssessmentKind::GeneralCompetencies,
            title: "General Competencies".to_string(),
            position: None,
            questions: vec![
                Question {
                    id: QuestionId("gc-integrity".to_string()),
                    prompt: "A teammate asks you to sign off work you have not reviewed. Do you refuse?"
                        .to_string(),
                    points: 40,
                    config: QuestionConfig::TrueFalse { correct: true },
                },
                Question {
                    id: QuestionId("gc-collaboration".to_string()),
                    prompt: "How often do you ask for feedback before a deadline?".to_string(),
                    points: 30,
                    config: QuestionConfig::Likert { points_map: None },
                },
                Question {
                    id: QuestionId("gc-adaptability".to_string()),
                    prompt: "Rate your comfort with shifting priorities".to_string(),
                    points: 30,
                    config: QuestionConfig::Rating { min: 1, max: 10 },
                },
            ],
            passing_score: 80,
            time_limit_minutes: Some(60),
            is_active: true,
        },
        AssessmentTemplate {
            id: TemplateId("platform-engineer-v1".to_string()),
            kind: AssessmentKind::SpecializedCompetencies,
            title: "Platform Engineering".to_string(),
            position: Some("Platform Engineer".to_string()),
            questions: vec![
                Question {
                    id: QuestionId("pe-topology".to_string()),
                    prompt: "Pick the deployment topology that survives a zone outage".to_string(),
                    points: 30,
                    config: QuestionConfig::SingleChoice {
                        options: vec![
                            ChoiceOption {
                                id: "multi-az".to_string(),
                                label: "Multi-AZ with automated failover".to_string(),
                                points: 30,
                            },
                            ChoiceOption {
                                id: "single-node".to_string(),
                                label: "Single node with nightly backups".to_string(),
                                points: 5,
                            },
                        ],
                    },
                },
                Question {
                    id: QuestionId("pe-incident".to_string()),
                    prompt: "Describe your approach to a paging storm".to_string(),
                    points: 30,
                    config: QuestionConfig::FreeText,
                },
            ],
            passing_score: 40,
            time_limit_minutes: Some(45),
            is_active: true,
        },
    ]
}

fn run_demo() -> Result<(), AppError> {
    let store = Arc::new(InMemoryStore::default());
    seed_templates(store.as_ref())?;

    let audit = Arc::new(TracingAuditSink);
    let notifier = Arc::new(TracingNotifier);
    let engine = Arc::new(PipelineEngine::new(
        store.clone(),
        audit.clone(),
        notifier.clone(),
    ));
    let scoring = ScoringConfig::default();
    let service = AssessmentService::new(store.clone(), engine.clone(), audit.clone(), scoring);
    let adapter = WebhookAdapter::new(store.clone(), engine, audit, scoring);

    println!("Talent pipeline demo");

    let outcome = adapter
        .handle_application_submitted(&demo_application_envelope())
        .map_err(demo_error)?;
    let IntakeOutcome::Created {
        person,
        application,
        routing,
    } = outcome
    else {
        return Err(demo_error("demo submission was unexpectedly deduplicated"));
    };

    println!("\nApplication received");
    println!(
        "- {} {} applied for {} ({})",
        person.first_name, person.last_name, application.position, application.id.0
    );
    println!("- routing: {}", routing.label());

    let session = service
        .start(
            &TemplateId("general-competencies-v1".to_string()),
            &person.id,
            None,
        )
        .map_err(demo_error)?;
    println!("\nGeneral competencies session {}", session.id.0);

    let submission = service
        .submit(
            &session.id,
            vec![
                SubmittedAnswer {
                    question_id: QuestionId("gc-integrity".to_string()),
                    answer: Answer::TrueFalse { value: true },
                },
                SubmittedAnswer {
                    question_id: QuestionId("gc-collaboration".to_string()),
                    answer: Answer::Likert { value: 5 },
                },
                SubmittedAnswer {
                    question_id: QuestionId("gc-adaptability".to_string()),
                    answer: Answer::Rating { value: 9 },
                },
            ],
        )
        .map_err(demo_error)?;

    println!(
        "- scored {}/{} raw, {} normalized (threshold {})",
        submission.raw_score,
        submission.max_score,
        submission.normalized_score,
        submission.threshold
    );
    println!(
        "- outcome: {}",
        if submission.passed { "passed" } else { "failed" }
    );

    let refreshed = store
        .application(&application.id)
        .map_err(demo_error)?
        .ok_or_else(|| demo_error("demo application vanished"))?;
    println!(
        "\nApplication {} now at stage: {}",
        refreshed.id.0,
        refreshed.current_stage.label()
    );
    if refreshed.current_stage == Stage::SpecializedCompetencies {
        println!("- next: specialized competencies assessment for the role");
    }

    Ok(())
}

fn demo_error(err: impl ToString) -> AppError {
    AppError::Workflow(err.to_string())
}

fn demo_application_envelope() -> WebhookEnvelope {
    let field = |key: &str, value: serde_json::Value| WebhookField {
        key: key.to_string(),
        field_type: "INPUT_TEXT".to_string(),
        value,
    };
    WebhookEnvelope {
        event_id: "evt-demo-1".to_string(),
        created_at: chrono::Utc::now(),
        data: WebhookData {
            submission_id: "sub-demo-1".to_string(),
            respondent_id: "resp-demo-1".to_string(),
            form_id: "form-apply".to_string(),
            fields: vec![
                field("email_x1", json!("demo.candidate@example.com")),
                field("firstName_x2", json!("Demo")),
                field("lastName_x3", json!("Candidate")),
                field("position_x4", json!("Platform Engineer")),
            ],
        },
    }
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
