use std::cell::RefCell;

use crate::errors::DriveError;
use crate::state::RunState;
use crate::workflow::{run_procedure, Procedure, StagedWorkflow, WorkflowOutcome};

fn logging_workflow<'a>(
    log: &'a RefCell<Vec<String>>,
    fail_once_at: Option<(usize, &'static str)>,
    failed: &'a RefCell<bool>,
) -> StagedWorkflow<'a, usize> {
    let mut workflow = StagedWorkflow::new("harvest", vec![0usize, 1, 2]);
    for stage in ["collect", "crack", "sort"] {
        workflow = workflow.stage(stage, move |item, _state| {
            if let Some((fail_item, fail_stage)) = fail_once_at {
                if *item == fail_item && stage == fail_stage && !*failed.borrow() {
                    *failed.borrow_mut() = true;
                    return Err(DriveError::Restart("verification lost".into()));
                }
            }
            log.borrow_mut().push(format!("item{item}:{stage}"));
            Ok(())
        });
    }
    workflow
}

#[test]
fn full_pass_runs_every_stage_in_order() {
    let log = RefCell::new(Vec::new());
    let failed = RefCell::new(false);
    let mut workflow = logging_workflow(&log, None, &failed);
    let mut state = RunState::new();

    workflow.run(&mut state).unwrap();

    assert_eq!(
        log.borrow().as_slice(),
        [
            "item0:collect", "item0:crack", "item0:sort",
            "item1:collect", "item1:crack", "item1:sort",
            "item2:collect", "item2:crack", "item2:sort",
        ]
    );
    let cp = state.checkpoint("harvest");
    assert_eq!(cp.item, 3);
    assert_eq!(cp.stage, None);
}

#[test]
fn restart_resumes_at_checkpointed_stage() {
    let log = RefCell::new(Vec::new());
    let failed = RefCell::new(false);
    // Stage 2 ("crack") of item 2 (index 1) restarts once.
    let mut workflow = logging_workflow(&log, Some((1, "crack")), &failed);
    let mut state = RunState::new();

    let err = workflow.run(&mut state).unwrap_err();
    assert!(matches!(err, DriveError::Restart(_)));

    // The in-progress marker survives the unwind.
    let cp = state.checkpoint("harvest");
    assert_eq!(cp.item, 1);
    assert_eq!(cp.stage.as_deref(), Some("crack"));

    // Driver retries: item 0 skipped entirely, item 1 resumes at "crack",
    // item 2 runs every stage.
    workflow.run(&mut state).unwrap();
    assert_eq!(
        log.borrow().as_slice(),
        [
            "item0:collect", "item0:crack", "item0:sort",
            "item1:collect",
            // restart hit here
            "item1:crack", "item1:sort",
            "item2:collect", "item2:crack", "item2:sort",
        ]
    );
}

#[test]
fn unexpected_errors_are_wrapped_into_restart() {
    let mut workflow = StagedWorkflow::new("grind", vec![0usize]).stage("deposit", |_, _| {
        Err(DriveError::InvalidConfig("grinder region missing".into()))
    });
    let mut state = RunState::new();

    let err = workflow.run(&mut state).unwrap_err();
    match err {
        DriveError::Restart(reason) => {
            assert!(reason.contains("deposit"));
            assert!(reason.contains("grinder region missing"));
        }
        other => panic!("expected Restart, got {other:?}"),
    }
    // The failed stage stays checkpointed for the retry.
    assert_eq!(state.checkpoint("grind").stage.as_deref(), Some("deposit"));
}

#[test]
fn cancellation_propagates_unwrapped() {
    let mut workflow =
        StagedWorkflow::new("grind", vec![0usize]).stage("deposit", |_, _| Err(DriveError::Cancelled));
    let mut state = RunState::new();

    assert!(matches!(workflow.run(&mut state), Err(DriveError::Cancelled)));
    assert!(matches!(
        workflow.run_with_retries(&mut state, 5),
        Err(DriveError::Cancelled)
    ));
}

#[test]
fn checkpoint_item_is_monotonic_within_a_pass() {
    let observed = RefCell::new(Vec::new());
    let mut workflow = StagedWorkflow::new("feed", vec![0usize, 1, 2]).stage("feed", |_, state| {
        observed.borrow_mut().push(state.checkpoint("feed").item);
        Ok(())
    });
    let mut state = RunState::new();

    workflow.run(&mut state).unwrap();
    let items = observed.borrow();
    assert!(items.windows(2).all(|w| w[0] <= w[1]), "items: {items:?}");

    // Only a new top-level run resets the ledger.
    state.reset_checkpoint("feed");
    assert_eq!(state.checkpoint("feed").item, 0);
}

#[test]
fn retries_complete_after_transient_restarts() {
    let failures = RefCell::new(2u32);
    let mut workflow = StagedWorkflow::new("feed", vec![0usize]).stage("feed", |_, _| {
        let mut left = failures.borrow_mut();
        if *left > 0 {
            *left -= 1;
            return Err(DriveError::Restart("flaky".into()));
        }
        Ok(())
    });
    let mut state = RunState::new();

    let outcome = workflow.run_with_retries(&mut state, 5).unwrap();
    assert_eq!(outcome, WorkflowOutcome::Completed);
}

#[test]
fn retry_exhaustion_is_reported_not_fatal() {
    let mut workflow = StagedWorkflow::new("feed", vec![0usize])
        .stage("feed", |_, _| Err(DriveError::Restart("always down".into())));
    let mut state = RunState::new();

    let outcome = workflow.run_with_retries(&mut state, 5).unwrap();
    match outcome {
        WorkflowOutcome::Exhausted {
            attempts,
            last_reason,
        } => {
            assert_eq!(attempts, 5);
            assert_eq!(last_reason, "always down");
        }
        other => panic!("expected Exhausted, got {other:?}"),
    }
}

struct NamedProcedure;

impl Procedure for NamedProcedure {
    fn name(&self) -> &str {
        "teleport:render"
    }

    fn run(&mut self, state: &mut RunState) -> Result<(), DriveError> {
        assert!(state.procedure_attached);
        Ok(())
    }
}

#[test]
fn run_procedure_attaches_a_live_handle() {
    let mut state = RunState::new();
    state.restart_requested = true;

    run_procedure(&mut NamedProcedure, &mut state).unwrap();

    assert_eq!(state.current_procedure.as_deref(), Some("teleport:render"));
    assert!(state.procedure_attached);
    assert!(
        !state.restart_requested,
        "starting a procedure clears any pending restart request"
    );
}
