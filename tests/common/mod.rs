#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use tripwise_rs::{
    services::{
        extraction::EXTRACTION_SYSTEM_PROMPT, planning::PLANNER_SYSTEM_PROMPT,
        synthesis::SYNTHESIS_SYSTEM_PROMPT,
    },
    Analyst, AnalystReply, Generator, GuideSearch, PlannerError, QueryExecutor, Record,
    Result, TripConfig, TripPlanner,
};

/// How the stub answers synthesis calls.
pub enum SynthesisReply {
    /// Return the user content unchanged
    Echo,
    Fixed(String),
    Fail(String),
}

/// Generator stub routed on the system instruction of each call.
pub struct StubGenerator {
    extraction: Mutex<VecDeque<std::result::Result<String, String>>>,
    planning: Mutex<VecDeque<std::result::Result<String, String>>>,
    default_plan: Option<String>,
    synthesis: SynthesisReply,
    pub extraction_calls: AtomicUsize,
    pub planning_calls: AtomicUsize,
    pub synthesis_calls: AtomicUsize,
    pub last_synthesis_input: Mutex<Option<String>>,
}

impl StubGenerator {
    pub fn new() -> Self {
        Self {
            extraction: Mutex::new(VecDeque::new()),
            planning: Mutex::new(VecDeque::new()),
            default_plan: None,
            synthesis: SynthesisReply::Echo,
            extraction_calls: AtomicUsize::new(0),
            planning_calls: AtomicUsize::new(0),
            synthesis_calls: AtomicUsize::new(0),
            last_synthesis_input: Mutex::new(None),
        }
    }

    pub fn extracting(self, reply: impl Into<String>) -> Self {
        self.extraction.lock().unwrap().push_back(Ok(reply.into()));
        self
    }

    pub fn failing_extraction(self, error: impl Into<String>) -> Self {
        self.extraction.lock().unwrap().push_back(Err(error.into()));
        self
    }

    pub fn planning(self, reply: impl Into<String>) -> Self {
        self.planning.lock().unwrap().push_back(Ok(reply.into()));
        self
    }

    pub fn failing_planning(self, error: impl Into<String>) -> Self {
        self.planning.lock().unwrap().push_back(Err(error.into()));
        self
    }

    /// Reply used once the scripted planning replies run out.
    pub fn planning_forever(mut self, reply: impl Into<String>) -> Self {
        self.default_plan = Some(reply.into());
        self
    }

    pub fn synthesizing(mut self, reply: SynthesisReply) -> Self {
        self.synthesis = reply;
        self
    }

    pub fn synthesis_input(&self) -> Option<Value> {
        self.last_synthesis_input
            .lock()
            .unwrap()
            .as_deref()
            .and_then(|text| serde_json::from_str(text).ok())
    }
}

#[async_trait]
impl Generator for StubGenerator {
    async fn generate(&self, system_instruction: &str, user_content: &str) -> Result<String> {
        let scripted = if system_instruction == EXTRACTION_SYSTEM_PROMPT {
            self.extraction_calls.fetch_add(1, Ordering::SeqCst);
            self.extraction.lock().unwrap().pop_front()
        } else if system_instruction == PLANNER_SYSTEM_PROMPT {
            self.planning_calls.fetch_add(1, Ordering::SeqCst);
            self.planning
                .lock()
                .unwrap()
                .pop_front()
                .or_else(|| self.default_plan.clone().map(Ok))
        } else if system_instruction == SYNTHESIS_SYSTEM_PROMPT {
            self.synthesis_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_synthesis_input.lock().unwrap() = Some(user_content.to_string());
            Some(match &self.synthesis {
                SynthesisReply::Echo => Ok(user_content.to_string()),
                SynthesisReply::Fixed(text) => Ok(text.clone()),
                SynthesisReply::Fail(error) => Err(error.clone()),
            })
        } else {
            None
        };

        match scripted {
            Some(Ok(text)) => Ok(text),
            Some(Err(error)) => Err(PlannerError::Generation(error)),
            None => Err(PlannerError::Generation("no scripted reply".to_string())),
        }
    }
}

/// Analyst stub answering by question substring; unmatched questions get no SQL.
#[derive(Default)]
pub struct StubAnalyst {
    replies: Vec<(String, std::result::Result<AnalystReply, String>)>,
    pub calls: AtomicUsize,
    pub questions: Mutex<Vec<String>>,
}

impl StubAnalyst {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answering(mut self, needle: &str, query: &str) -> Self {
        let reply = AnalystReply {
            text: Some(format!("Interpretation of: {}", needle)),
            query: Some(query.to_string()),
            suggestions: Vec::new(),
        };
        self.replies.push((needle.to_string(), Ok(reply)));
        self
    }

    pub fn failing(mut self, needle: &str, error: &str) -> Self {
        self.replies.push((needle.to_string(), Err(error.to_string())));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Analyst for StubAnalyst {
    async fn ask(&self, question: &str, _semantic_model: &str) -> Result<AnalystReply> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.questions.lock().unwrap().push(question.to_string());

        match self
            .replies
            .iter()
            .find(|(needle, _)| question.contains(needle.as_str()))
        {
            Some((_, Ok(reply))) => Ok(reply.clone()),
            Some((_, Err(error))) => Err(PlannerError::Analyst(error.clone())),
            None => Ok(AnalystReply::default()),
        }
    }
}

enum ExecutorRule {
    Rows(Vec<Record>),
    Fail(String),
    Panic,
}

/// Executor stub answering by SQL substring; unmatched statements return no rows.
#[derive(Default)]
pub struct StubExecutor {
    rules: Vec<(String, ExecutorRule)>,
    pub statements: Mutex<Vec<String>>,
}

impl StubExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn returning(mut self, needle: &str, rows: Vec<Record>) -> Self {
        self.rules.push((needle.to_string(), ExecutorRule::Rows(rows)));
        self
    }

    pub fn failing(mut self, needle: &str, error: &str) -> Self {
        self.rules
            .push((needle.to_string(), ExecutorRule::Fail(error.to_string())));
        self
    }

    pub fn panicking(mut self, needle: &str) -> Self {
        self.rules.push((needle.to_string(), ExecutorRule::Panic));
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryExecutor for StubExecutor {
    async fn execute(&self, query: &str) -> Result<Vec<Record>> {
        self.statements.lock().unwrap().push(query.to_string());

        match self
            .rules
            .iter()
            .find(|(needle, _)| query.contains(needle.as_str()))
        {
            Some((_, ExecutorRule::Rows(rows))) => Ok(rows.clone()),
            Some((_, ExecutorRule::Fail(error))) => Err(PlannerError::Execution(error.clone())),
            Some((needle, ExecutorRule::Panic)) => panic!("executor stub told to panic on {}", needle),
            None => Ok(Vec::new()),
        }
    }
}

/// Guide search stub returning fixed passages.
pub struct StubSearch {
    reply: std::result::Result<Vec<Value>, String>,
    pub calls: AtomicUsize,
    pub queries: Mutex<Vec<String>>,
}

impl StubSearch {
    pub fn with_passages(chunks: &[&str]) -> Self {
        let passages = chunks.iter().map(|chunk| json!({"CHUNK": chunk})).collect();
        Self {
            reply: Ok(passages),
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: &str) -> Self {
        Self {
            reply: Err(error.to_string()),
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GuideSearch for StubSearch {
    async fn search(&self, query: &str, _limit: usize) -> Result<Vec<Value>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.to_string());
        self.reply
            .clone()
            .map_err(PlannerError::Search)
    }
}

pub struct Harness {
    pub generator: Arc<StubGenerator>,
    pub analyst: Arc<StubAnalyst>,
    pub executor: Arc<StubExecutor>,
    pub search: Arc<StubSearch>,
    pub planner: TripPlanner,
}

pub fn test_config() -> TripConfig {
    TripConfig::new()
        .with_database("DB")
        .with_schema("S")
        .with_call_timeout(Duration::from_secs(5))
        .with_max_steps(6)
}

pub fn harness(
    generator: StubGenerator,
    analyst: StubAnalyst,
    executor: StubExecutor,
    search: StubSearch,
) -> Harness {
    let generator = Arc::new(generator);
    let analyst = Arc::new(analyst);
    let executor = Arc::new(executor);
    let search = Arc::new(search);
    let planner = TripPlanner::new(
        test_config(),
        generator.clone(),
        analyst.clone(),
        executor.clone(),
        search.clone(),
    );

    Harness {
        generator,
        analyst,
        executor,
        search,
        planner,
    }
}

/// Turn a JSON array of objects into records.
pub fn records(value: Value) -> Vec<Record> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

pub fn flight_rows(prices: &[i64]) -> Vec<Record> {
    records(Value::Array(
        prices
            .iter()
            .enumerate()
            .map(|(i, price)| {
                json!({
                    "AIRLINE": format!("Air {}", i),
                    "PRICE": price,
                    "DURATION": "02:00",
                })
            })
            .collect(),
    ))
}

pub fn intent_json(source: &str, destinations: &[&str]) -> String {
    json!({"source_city": source, "destination_cities": destinations}).to_string()
}
