//! # Output Normalization Module / 输出规范化模块
//!
//! Turns the raw output of one load-generator invocation into a fixed-schema [`TrialResult`].
//! Two payload shapes are understood: the current structured report (an object with a `total`
//! key) and the legacy flat record. Anything else becomes an `invalid_raw_output` result that
//! carries a bounded, redacted tail of the payload. Normalization never fails.
//!
//! 将一次负载生成器调用的原始输出转换为固定模式的 [`TrialResult`]。
//! 支持两种负载格式：当前的结构化报告（带有 `total` 键的对象）和旧版扁平记录。
//! 其他任何内容都会变成 `invalid_raw_output` 结果，并携带负载的有界、已脱敏尾部。
//! 规范化永远不会失败。

use serde_json::{Map, Value};

use crate::core::execution::TrialOutcome;
use crate::core::models::{ErrorKind, Latency, Operation, TrialResult, TrialSpec, TrialState};
use crate::infra::redact::{Redactor, bounded_tail};

/// Lines kept in a diagnostic tail / 诊断尾部保留的行数
pub const TAIL_LINES: usize = 40;
/// Byte cap of a diagnostic tail / 诊断尾部的字节上限
pub const TAIL_BYTES: usize = 4096;

const MIB: f64 = 1024.0 * 1024.0;
/// Candidate start positions tried before giving up on a payload.
const MAX_JSON_STARTS: usize = 1024;

/// Metrics extracted from a recognized payload.
/// 从可识别负载中提取的指标。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Metrics {
    pub throughput_mbps: f64,
    pub ops_per_sec: f64,
    pub latency: Latency,
    pub total_operations: u64,
    pub errors: u64,
    pub error_rate: f64,
}

/// Normalizes a supervised trial into its one and only [`TrialResult`].
///
/// Timeouts, non-zero exits and spawn failures become error-kind results without looking at
/// the payload; a clean exit is parsed and falls back to `invalid_raw_output`.
///
/// 将受监督的试验规范化为其唯一的 [`TrialResult`]。
pub fn normalize(spec: &TrialSpec, outcome: &TrialOutcome, redactor: &Redactor) -> TrialResult {
    let mut result = if let Some(message) = &outcome.spawn_error {
        TrialResult::failed(
            spec,
            ErrorKind::SpawnFailed,
            diagnostic_tail(message, redactor),
        )
    } else {
        match outcome.state {
            TrialState::Completed => parse_raw_output(spec, &outcome.raw_output, redactor),
            TrialState::TimedOut => TrialResult::failed(
                spec,
                ErrorKind::Timeout,
                diagnostic_tail(&outcome.raw_output, redactor),
            ),
            _ => TrialResult::failed(
                spec,
                ErrorKind::ProcessFailed,
                diagnostic_tail(&outcome.raw_output, redactor),
            ),
        }
    };
    result.exit_code = outcome.exit_code;
    result.elapsed_secs = outcome.elapsed.as_secs_f64();
    result
}

/// Parses the raw output of a cleanly exited trial.
/// 解析正常退出的试验的原始输出。
pub fn parse_raw_output(spec: &TrialSpec, raw: &str, redactor: &Redactor) -> TrialResult {
    match extract_payload(raw, spec.operation) {
        Some(metrics) => TrialResult {
            throughput_mbps: metrics.throughput_mbps,
            ops_per_sec: metrics.ops_per_sec,
            latency: metrics.latency,
            total_operations: metrics.total_operations,
            errors: metrics.errors,
            error_rate: metrics.error_rate,
            ..TrialResult::zeroed(spec)
        },
        None => {
            tracing::warn!(trial = %spec.label(), "raw output carried no usable result payload");
            TrialResult::failed(
                spec,
                ErrorKind::InvalidRawOutput,
                diagnostic_tail(raw, redactor),
            )
        }
    }
}

/// Redacts `raw` and keeps its last [`TAIL_LINES`] lines, capped at [`TAIL_BYTES`].
/// Redaction runs first so a secret cut by the byte cap cannot leak a prefix.
///
/// 对 `raw` 进行脱敏并保留其最后 [`TAIL_LINES`] 行，上限为 [`TAIL_BYTES`] 字节。
pub fn diagnostic_tail(raw: &str, redactor: &Redactor) -> Option<String> {
    let redacted = redactor.redact(raw);
    let tail = bounded_tail(redacted.trim_end(), TAIL_LINES, TAIL_BYTES);
    if tail.trim().is_empty() {
        None
    } else {
        Some(tail)
    }
}

/// Finds the first recognized result payload inside raw output and extracts its metrics.
///
/// Every JSON candidate is offered to [`parse_payload`] in order, so a JSON log line printed
/// before the report does not hide it.
///
/// 在原始输出中查找第一个可识别的结果负载并提取其指标。
/// 每个 JSON 候选都会按顺序交给 [`parse_payload`]，因此报告之前打印的 JSON 日志行不会遮蔽它。
pub fn extract_payload(raw: &str, operation: Operation) -> Option<Metrics> {
    json_candidates(raw).find_map(|value| parse_payload(&value, operation))
}

/// Finds the first JSON document inside raw output that may start with progress text
/// (e.g. `Throughput ... Terminating benchmark.`) or end with trailing noise.
///
/// 在可能以进度文本开头或以尾随噪声结尾的原始输出中查找第一个 JSON 文档。
pub fn extract_json(raw: &str) -> Option<Value> {
    json_candidates(raw).next()
}

/// Record-shaped JSON values in `raw`, in order of their start position.
///
/// Each `{` or `[` is tried as a start position. A candidate is yielded when a complete JSON
/// value parses from it; trailing text after that value is ignored.
fn json_candidates(raw: &str) -> impl Iterator<Item = Value> + '_ {
    raw.char_indices()
        .filter(|(_, c)| *c == '{' || *c == '[')
        .take(MAX_JSON_STARTS)
        .filter_map(|(idx, _)| {
            let mut stream = serde_json::Deserializer::from_str(&raw[idx..]).into_iter::<Value>();
            match stream.next() {
                Some(Ok(value)) if is_record_shaped(&value) => Some(value),
                _ => None,
            }
        })
}

/// An object, or a non-empty array of objects. Rules out log prefixes such as `[1/3]`.
fn is_record_shaped(value: &Value) -> bool {
    match value {
        Value::Object(_) => true,
        Value::Array(items) => !items.is_empty() && items.iter().all(Value::is_object),
        _ => false,
    }
}

/// Recognizes a payload and extracts its metrics.
/// 识别负载并提取其指标。
pub fn parse_payload(value: &Value, operation: Operation) -> Option<Metrics> {
    match value {
        Value::Object(map) if map.get("total").is_some_and(|t| !t.is_null()) => {
            Some(parse_structured(map, operation))
        }
        Value::Object(map) => parse_flat(map),
        Value::Array(items) => items.first().and_then(Value::as_object).and_then(parse_flat),
        _ => None,
    }
}

/// Structured report: totals under `total`, per-operation blocks under `by_op_type`.
fn parse_structured(root: &Map<String, Value>, operation: Operation) -> Metrics {
    let empty = Map::new();
    let total = object(root.get("total")).unwrap_or(&empty);
    let op_block = root
        .get("by_op_type")
        .and_then(Value::as_object)
        .and_then(|by_op| object(by_op.get(&operation.as_str().to_ascii_uppercase())))
        .filter(|block| !block.is_empty())
        .unwrap_or(total);

    let throughput = object(total.get("throughput"))
        .or_else(|| object(op_block.get("throughput")))
        .unwrap_or(&empty);

    let seconds = number(throughput.get("measure_duration_millis")) / 1000.0;
    let bytes = first_nonzero([
        number(throughput.get("bytes")),
        number(total.get("total_bytes")),
    ]);
    let requests = first_nonzero([
        number(total.get("total_requests")),
        number(total.get("total_objects")),
    ]) as u64;
    let errors = number(total.get("total_errors")) as u64;
    let ops = first_nonzero([
        number(throughput.get("ops")),
        number(throughput.get("objects")),
        if seconds > 0.0 { requests as f64 } else { 0.0 },
    ]);

    let per_second = |value: f64| if seconds > 0.0 { value / seconds } else { 0.0 };
    let clients = object(op_block.get("requests_by_client"))
        .filter(|c| !c.is_empty())
        .or_else(|| object(total.get("requests_by_client")));

    Metrics {
        throughput_mbps: per_second(bytes / MIB),
        ops_per_sec: per_second(ops),
        latency: clients.and_then(first_client_latency).unwrap_or_default(),
        total_operations: requests,
        errors,
        error_rate: if requests > 0 {
            errors as f64 / requests as f64
        } else {
            0.0
        },
    }
}

/// Latency of the first client's first segment that reports any: time-to-first-byte when
/// present, request duration otherwise.
fn first_client_latency(clients: &Map<String, Value>) -> Option<Latency> {
    let (_, segments) = clients.iter().next()?;
    let segments: Vec<&Value> = match segments {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    segments.into_iter().find_map(|segment| {
        let requests = object(segment.get("single_sized_requests"))?;
        if let Some(first_byte) = object(requests.get("first_byte")).filter(|fb| !fb.is_empty()) {
            return Some(Latency {
                avg: number(first_byte.get("average_millis")),
                p50: number(first_byte.get("median_millis")),
                p90: number(first_byte.get("p90_millis")),
                p99: number(first_byte.get("p99_millis")),
            });
        }
        let avg = requests.get("dur_avg_millis").filter(|v| !v.is_null())?;
        let avg = number(Some(avg));
        Some(Latency {
            avg,
            p50: first_nonzero([number(requests.get("dur_median_millis")), avg]),
            p90: number(requests.get("dur_90_millis")),
            p99: number(requests.get("dur_99_millis")),
        })
    })
}

const FLAT_KEYS: [&str; 9] = [
    "throughput_mb",
    "ops_per_sec",
    "latency_avg_ms",
    "latency_p50_ms",
    "latency_p90_ms",
    "latency_p99_ms",
    "operations",
    "errors",
    "error_rate",
];

/// Legacy flat record. An object carrying none of the known keys is not a result.
fn parse_flat(record: &Map<String, Value>) -> Option<Metrics> {
    if !FLAT_KEYS.iter().any(|key| record.contains_key(*key)) {
        return None;
    }
    Some(Metrics {
        throughput_mbps: number(record.get("throughput_mb")),
        ops_per_sec: number(record.get("ops_per_sec")),
        latency: Latency {
            avg: number(record.get("latency_avg_ms")),
            p50: number(record.get("latency_p50_ms")),
            p90: number(record.get("latency_p90_ms")),
            p99: number(record.get("latency_p99_ms")),
        },
        total_operations: number(record.get("operations")) as u64,
        errors: number(record.get("errors")) as u64,
        error_rate: number(record.get("error_rate")),
    })
}

fn object(value: Option<&Value>) -> Option<&Map<String, Value>> {
    value.and_then(Value::as_object)
}

/// Numeric field as `f64`; numeric strings are accepted, anything else is zero.
fn number(value: Option<&Value>) -> f64 {
    let n = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    };
    if n.is_finite() && n > 0.0 { n } else { 0.0 }
}

fn first_nonzero<const N: usize>(candidates: [f64; N]) -> f64 {
    candidates.into_iter().find(|v| *v > 0.0).unwrap_or(0.0)
}
