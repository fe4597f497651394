//! Unit tests for registration, binding and dispatch.

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use rstest::{fixture, rstest};

use super::*;
use crate::command::{CommandError, CommandStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::VariantNames)]
enum Colour {
    Red,
    Green,
}

crate::arg_enum!(Colour);

#[derive(Debug, Default)]
struct Greeter {
    calls: Mutex<Vec<(String, i32)>>,
}

impl Greeter {
    fn greet(&self, output: OutputSink, name: String, times: Option<i32>) {
        let times = times.unwrap_or(1);
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((name.clone(), times));
        for _ in 0..times {
            writeln!(output, "hello {name}");
        }
    }

    fn calls(&self) -> Vec<(String, i32)> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CommandTarget for Greeter {
    fn register(registry: &mut RegistryBuilder<Self>) {
        registry
            .command("Greet", Self::greet)
            .alias("hi")
            .alias("HI")
            .describe("Greets someone.")
            .param("name", "Person to greet.")
            .param("times", "Number of greetings.");
        registry
            .command("sum", |_: &Self, output: OutputSink, values: Vec<i64>| {
                let total: i64 = values.iter().sum();
                write!(output, "{total}");
            })
            .describe("Adds numbers.")
            .param("values", "");
        registry.command("shout", |_: &Self, output: OutputSink, text: RestOfLine| {
            output.write(&text.to_uppercase());
        });
        registry.command("paint", |_: &Self, colour: Colour| colour == Colour::Red);
        registry.command("fail", |_: &Self| -> Result<(), String> {
            Err("boom".to_owned())
        });
        registry.command(
            "wait",
            |_: Arc<Self>, millis: u64, cancel: CancellationToken| async move {
                tokio::select! {
                    () = cancel.cancelled() => CommandStatus::Failed,
                    () = tokio::time::sleep(Duration::from_millis(millis)) => CommandStatus::Succeeded,
                }
            },
        );
        registry.command("whoami", |_: &Self, output: OutputSink, id: ConnectionId| {
            output.write(&id.to_string());
        });
        registry.command("open", |_: &Self, _path: PathBuf| {});
        registry.command("greet", |_: &Self| {});
        registry.command("bad name", |_: &Self| {});
        registry.command("tail", |_: &Self, _words: Vec<String>, _last: String| {});
        registry.command("gap", |_: &Self, _first: Option<u8>, _second: u8| {});
        registry.command("dup", |_: &Self| {}).alias("sum");
    }
}

struct Harness {
    registry: CommandRegistry<Greeter>,
    target: Arc<Greeter>,
    context: CommandContext,
}

impl Harness {
    async fn run(&self, line: &str) -> Result<CommandResult, DispatchError> {
        let future = self
            .registry
            .run(line, Arc::clone(&self.target), self.context.clone())?;
        Ok(future.await)
    }

    fn output(&self) -> String {
        self.context.output.contents()
    }
}

#[fixture]
fn harness() -> Harness {
    Harness {
        registry: CommandRegistry::for_target(),
        target: Arc::new(Greeter::default()),
        context: CommandContext {
            output: OutputSink::default(),
            connection: ConnectionId::new(),
            cancel: CancellationToken::new(),
        },
    }
}

#[rstest]
fn greet_arity_comes_from_its_parameters(harness: Harness) {
    let entry = harness.registry.get("greet").expect("greet registered");
    assert_eq!(entry.arity(), Arity { min: 1, max: Some(2) });
    assert_eq!(entry.aliases(), ["hi"]);
}

#[rstest]
#[tokio::test]
async fn optional_parameter_defaults_in_handler(harness: Harness) {
    let result = harness.run("Greet bob").await.expect("dispatched");
    assert_eq!(result, Ok(CommandStatus::Succeeded));
    assert_eq!(harness.target.calls(), vec![("bob".to_owned(), 1)]);
    assert_eq!(harness.output(), "hello bob\n");
}

#[rstest]
#[tokio::test]
async fn lookup_ignores_case_and_resolves_aliases(harness: Harness) {
    let result = harness.run("HI alice 2").await.expect("dispatched");
    assert_eq!(result, Ok(CommandStatus::Succeeded));
    assert_eq!(harness.target.calls(), vec![("alice".to_owned(), 2)]);
}

#[rstest]
#[case::too_few("greet")]
#[case::too_many("greet a 1 extra")]
#[tokio::test]
async fn arity_violations_never_invoke_the_handler(harness: Harness, #[case] line: &str) {
    let error = harness.run(line).await.expect_err("arity rejected");
    assert!(matches!(error, DispatchError::Arity { .. }));
    assert!(harness.target.calls().is_empty());
}

#[rstest]
#[tokio::test]
async fn invalid_tokens_are_reported_with_position(harness: Harness) {
    let error = harness.run("greet bob lots").await.expect_err("invalid");
    let DispatchError::InvalidArgument { command, source } = error else {
        panic!("unexpected error: {error:?}");
    };
    assert_eq!(command, "greet");
    assert!(matches!(
        source,
        ArgumentError::Invalid { position: 1, expected: "int", .. }
    ));
    assert!(harness.target.calls().is_empty());
}

#[rstest]
#[tokio::test]
async fn unknown_and_blank_lines_fail(harness: Harness) {
    assert_eq!(
        harness.run("nope").await.expect_err("unknown"),
        DispatchError::NotFound {
            name: "nope".to_owned()
        }
    );
    assert_eq!(
        harness.run("   ").await.expect_err("blank"),
        DispatchError::Empty
    );
}

#[rstest]
#[tokio::test]
async fn variadic_parameter_absorbs_remaining_tokens(harness: Harness) {
    let result = harness.run("sum 1 2 3 4").await.expect("dispatched");
    assert_eq!(result, Ok(CommandStatus::Succeeded));
    assert_eq!(harness.output(), "10");
}

#[rstest]
#[tokio::test]
async fn rest_of_line_keeps_inner_spacing(harness: Harness) {
    let result = harness.run("shout  hello   world ").await.expect("dispatched");
    assert_eq!(result, Ok(CommandStatus::Succeeded));
    assert_eq!(harness.output(), "HELLO   WORLD");
}

#[rstest]
#[case("paint RED", Ok(CommandStatus::Succeeded))]
#[case("paint green", Ok(CommandStatus::Failed))]
#[tokio::test]
async fn enums_parse_case_insensitively(
    harness: Harness,
    #[case] line: &str,
    #[case] expected: CommandResult,
) {
    assert_eq!(harness.run(line).await.expect("dispatched"), expected);
}

#[rstest]
#[tokio::test]
async fn unknown_enum_variant_lists_choices(harness: Harness) {
    let error = harness.run("paint blue").await.expect_err("invalid");
    assert!(error.to_string().contains("Red, Green"), "{error}");
}

#[rstest]
#[tokio::test]
async fn handler_errors_become_command_errors(harness: Harness) {
    let result = harness.run("fail").await.expect("dispatched");
    assert_eq!(result, Err(CommandError::new("boom")));
}

#[rstest]
#[tokio::test]
async fn async_handlers_observe_cancellation(harness: Harness) {
    let future = harness
        .registry
        .run("wait 60000", Arc::clone(&harness.target), harness.context.clone())
        .expect("dispatched");
    harness.context.cancel.cancel();
    assert_eq!(future.await, Ok(CommandStatus::Failed));
}

#[rstest]
#[tokio::test]
async fn connection_parameter_binds_the_caller(harness: Harness) {
    let result = harness.run("whoami").await.expect("dispatched");
    assert_eq!(result, Ok(CommandStatus::Succeeded));
    assert_eq!(harness.output(), harness.context.connection.to_string());
}

#[rstest]
fn invalid_declarations_are_rejected(harness: Harness) {
    let rejected = harness.registry.rejected();
    assert!(rejected.contains(&RegistrationError::DuplicateName {
        name: "greet".to_owned()
    }));
    assert!(rejected.contains(&RegistrationError::InvalidName {
        name: "bad name".to_owned()
    }));
    assert!(rejected.contains(&RegistrationError::TrailingParameter {
        command: "tail".to_owned(),
        shape: ParamShape::Variadic,
    }));
    assert!(rejected.contains(&RegistrationError::RequiredAfterOptional {
        command: "gap".to_owned(),
        position: 1,
    }));
    assert!(rejected.contains(&RegistrationError::DuplicateAlias {
        command: "dup".to_owned(),
        alias: "sum".to_owned(),
    }));
    assert!(!harness.registry.contains("tail"));
    assert!(harness.registry.contains("dup"));
    assert!(harness.registry.contains("open"));
}

#[rstest]
fn help_lists_usage_and_aliases(harness: Harness) {
    let help = harness.registry.help();
    assert!(help.starts_with("Available commands:\n"));
    assert!(help.contains("greet <name> [times]"), "{help}");
    assert!(help.contains("Greets someone. (aliases: hi)"), "{help}");
    assert!(help.contains("sum [values...]"), "{help}");
    assert!(help.contains("paint <Colour>"), "{help}");
}

#[rstest]
fn help_for_documents_parameters(harness: Harness) {
    let help = harness.registry.help_for("HI").expect("known command");
    assert_eq!(
        help,
        "Usage: greet <name> [times]\nGreets someone.\nAliases: hi\nArguments:\n  \
         name   Person to greet.\n  times  Number of greetings.\n"
    );
    assert!(harness.registry.help_for("missing").is_none());
}
