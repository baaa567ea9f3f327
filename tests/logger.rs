// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use logshape::Arg;
use logshape::Engine;
use logshape::ErrorLike;
use logshape::Level;
use logshape::LevelFilter;
use logshape::Logger;
use logshape::Serializers;
use logshape::append::Memory;
use logshape::args::normalize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

fn capture(level: Level) -> (Logger, Memory) {
    let memory = Memory::default();
    let mut bindings = Map::new();
    bindings.insert("name".to_string(), json!("X"));
    let engine = Engine::builder()
        .level(level)
        .serializers(Serializers::defaults())
        .bindings(bindings)
        .append(memory.clone())
        .build();
    (Logger::new(engine), memory)
}

#[test]
fn test_fields_and_message() {
    let (logger, memory) = capture(Level::Trace);
    logshape::info!(logger, json!({"a": 1, "b": [1, 2]}), "hello");

    let record = &memory.records()[0];
    assert_eq!(record.message(), Some("hello"));
    assert_eq!(
        Value::Object(record.fields().cloned().unwrap()),
        json!({"a": 1, "b": [1, 2]})
    );
}

#[test]
fn test_message_with_empty_context_has_no_payload() {
    let emission = normalize(&Map::new(), "err", ["only a message"]);
    assert!(emission.payload.is_empty());
    assert_eq!(emission.message.as_deref(), Some("only a message"));
}

#[test]
fn test_two_errors_in_call_order() {
    let (logger, memory) = capture(Level::Info);
    logshape::error!(
        logger,
        "both failed",
        ErrorLike::new("Error", "first"),
        ErrorLike::new("TypeError", "second"),
    );

    let record = &memory.records()[0];
    let errors = record.get("err").unwrap().as_array().unwrap();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0]["message"], json!("first"));
    assert_eq!(errors[1]["message"], json!("second"));
    assert_eq!(errors[1]["type"], json!("TypeError"));
}

#[test]
fn test_error_then_message_either_order() {
    let (logger, memory) = capture(Level::Info);
    logger.error([Arg::from("boom"), Arg::from(ErrorLike::new("Error", "E"))]);
    logger.error([Arg::from(ErrorLike::new("Error", "E")), Arg::from("boom")]);

    for record in memory.records() {
        assert_eq!(record.message(), Some("boom"));
        assert_eq!(record.get("err").unwrap()["message"], json!("E"));
    }
}

#[test]
fn test_rust_errors_are_captured() {
    let (logger, memory) = capture(Level::Info);
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "config.toml missing");
    logshape::warn!(logger, io, "falling back to defaults");

    let err = memory.records()[0].get("err").cloned().unwrap();
    assert_eq!(err["message"], json!("config.toml missing"));
    assert_eq!(err["name"], json!("Error"));
}

#[test]
fn test_child_bindings_and_call_fields() {
    let (logger, memory) = capture(Level::Info);
    let child = logger.child(json!({"a": 1}));
    logshape::info!(child, json!({"b": 2}), "hi");

    let record = &memory.records()[0];
    assert_eq!(record.message(), Some("hi"));
    assert_eq!(record.bindings()["a"], json!(1));
    assert_eq!(
        Value::Object(record.merged()),
        json!({"name": "X", "a": 1, "b": 2})
    );
}

#[test]
fn test_child_context_isolation() {
    let (logger, memory) = capture(Level::Info);
    let mut first = logger.child(json!({"c": 1}));
    let second = logger.child(json!({"c": 2}));
    first.set_context(json!({"leak": true}));

    second.info(["from second"]);
    first.info(["from first"]);

    let records = memory.records();
    assert_eq!(records[0].get("leak"), None);
    assert_eq!(records[1].get("leak"), Some(&json!(true)));
}

#[test]
fn test_set_context_later_wins() {
    let (mut logger, memory) = capture(Level::Info);
    logger.set_context(json!({"k": 1}));
    logger.set_context(json!({"k": 2}));
    logger.info(["x"]);
    assert_eq!(memory.records()[0].get("k"), Some(&json!(2)));
}

#[test]
fn test_failing_serializer_does_not_stop_the_call() {
    let memory = Memory::default();
    let serializers = Serializers::defaults().with("payment", |_| anyhow::bail!("card number"));
    let logger = Logger::new(
        Engine::builder()
            .serializers(serializers)
            .append(memory.clone())
            .build(),
    );

    logshape::info!(logger, json!({"payment": {"pan": "4111"}, "amount": 3}), "charged");

    let record = &memory.records()[0];
    assert_eq!(record.message(), Some("charged"));
    assert_eq!(
        record.get("payment"),
        Some(&json!("[Serialization Error: card number]"))
    );
    assert_eq!(record.get("amount"), Some(&json!(3)));
}

#[test]
fn test_silent_emits_nothing() {
    let memory = Memory::default();
    let logger = Logger::new(
        Engine::builder()
            .level(LevelFilter::Off)
            .append(memory.clone())
            .build(),
    );
    logger.fatal(["nobody hears this"]);
    assert!(memory.records().is_empty());
}

#[test]
fn test_many_random_fields() {
    use rand::Rng;

    let (logger, memory) = capture(Level::Info);
    let mut rng = rand::rng();
    let mut expected = Map::new();
    for i in 0..32 {
        expected.insert(format!("k{i}"), json!(rng.random::<u32>()));
    }
    logger.info([Arg::from(expected.clone())]);

    let record = &memory.records()[0];
    assert_eq!(record.fields().cloned().unwrap(), expected);
    assert_eq!(record.message(), None);
}
