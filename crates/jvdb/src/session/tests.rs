use expect_test::expect;

use super::*;
use crate::console::Command;
use crate::harness::{FakeClass, OutputBuffer, ScriptStep, ScriptedTarget, Stop, MAIN_THREAD};
use crate::spec::BreakpointSpec;
use crate::target::{
    CodeLocation, EventBatch, RequestId, RequestKind, StepDepth, TargetEvent, Value,
};

fn session_for(target: &ScriptedTarget) -> (DebugSession, OutputBuffer) {
    let out = OutputBuffer::default();
    let session = DebugSession::new(
        Box::new(target.clone()),
        Printer::new(Box::new(out.clone())),
    );
    (session, out)
}

fn run_script(session: &mut DebugSession, script: &str) {
    session
        .run(&mut CommandConsole::scripted(script))
        .expect("session run");
}

fn demo() -> FakeClass {
    FakeClass::new("Demo", "main", &[5, 10, 11, 12])
}

fn hit(line: u32, i: i32) -> ScriptStep {
    ScriptStep::Line(Stop::at("Demo", "main", line).local("i", "int", Value::Int(i)))
}

#[test]
fn breakpoint_in_loop_pauses_each_iteration() {
    let target = ScriptedTarget::new()
        .class(demo())
        .then(ScriptStep::Start)
        .then(ScriptStep::LoadClass("Demo".into()))
        .then(hit(10, 0))
        .then(hit(10, 1))
        .then(hit(10, 2));
    let state = target.state();
    let (mut session, out) = session_for(&target);
    let config = DebugConfig::from_json(
        r#"{"pauseOnException":"uncaught","breakpoints":[{"class":"Demo","line":10}]}"#,
    )
    .unwrap();
    session.apply_config(&config);

    run_script(&mut session, "resume\nprint i\nresume\nresume\nresume\n");

    expect![[r#"
[VMStart] Target VM started. Type 'help' to see commands.
[ClassPrepare] Demo
[breakpoint set] Demo:10
[Breakpoint] Demo.main(Demo.java:10)
i = 0
[Breakpoint] Demo.main(Demo.java:10)
[Breakpoint] Demo.main(Demo.java:10)
[VMExit] Target VM exited.
"#]]
    .assert_eq(&out.contents());
    let state = state.get();
    assert_eq!(state.resumes, 5);
    assert_eq!(state.redundant_resumes, 0);
    assert_eq!(state.disposed, 1);
    assert!(session.cursor().quit);
}

#[test]
fn break_on_line_without_code_installs_nothing() {
    let target = ScriptedTarget::new()
        .loaded_class(FakeClass::new("BadClass", "run", &[1, 2]))
        .then(ScriptStep::Start);
    let state = target.state();
    let (mut session, out) = session_for(&target);

    run_script(&mut session, "break BadClass:9999\nlist\nquit\n");

    expect![[r#"
[VMStart] Target VM started. Type 'help' to see commands.
[warn] no code at BadClass:9999
Added breakpoint: BadClass:9999
[no breakpoints]
"#]]
    .assert_eq(&out.contents());
    let state = state.get();
    assert!(state
        .active(|req| matches!(req, WatchRequest::Breakpoint { .. }))
        .is_empty());
    assert_eq!(state.resumes, 0);
}

#[test]
fn class_without_line_info_warns() {
    let target = ScriptedTarget::new().loaded_class(demo().without_line_info());
    let (mut session, out) = session_for(&target);

    session.add_breakpoint(BreakpointSpec::line("Demo", 10));

    expect![[r#"
[warn] debug info absent for Demo
"#]]
    .assert_eq(&out.contents());
    assert!(session.registry().installed().is_empty());
    assert_eq!(session.registry().pending().len(), 1);
}

#[test]
fn deferred_breakpoints_install_once_per_class_prepare() {
    let target = ScriptedTarget::new()
        .class(demo())
        .class(FakeClass::new("Other", "run", &[3]))
        .then(ScriptStep::LoadClass("Other".into()))
        .then(ScriptStep::LoadClass("Demo".into()));
    let state = target.state();
    let (mut session, out) = session_for(&target);
    session.add_breakpoint(BreakpointSpec::line("Demo", 10));
    session.add_breakpoint(BreakpointSpec::method("Demo", "run"));
    assert!(out.contents().is_empty());
    assert!(session.registry().installed().is_empty());

    run_script(&mut session, "");

    expect![[r#"
[ClassPrepare] Demo
[breakpoint set] Demo:10
[method-entry set] Demo#run
[VMExit] Target VM exited.
"#]]
    .assert_eq(&out.contents());
    let state = state.get();
    let count = |kind: RequestKind| {
        state
            .created
            .iter()
            .filter(|req| req.kind() == kind)
            .count()
    };
    assert_eq!(count(RequestKind::ClassPrepare), 1);
    assert_eq!(count(RequestKind::Breakpoint), 1);
    assert_eq!(count(RequestKind::MethodEntry), 1);
    assert_eq!(session.registry().installed().len(), 2);
}

#[test]
fn method_entry_pauses_only_for_named_method() {
    let caller = CodeLocation::new("Demo", "main", Some("Demo.java"), Some(12));
    let target = ScriptedTarget::new()
        .loaded_class(demo())
        .then(ScriptStep::Start)
        .then(ScriptStep::EnterMethod(Stop::at("Demo", "loopBody", 20)))
        .then(ScriptStep::EnterMethod(
            Stop::at("Demo", "fib", 30).caller(caller),
        ));
    let state = target.state();
    let (mut session, out) = session_for(&target);
    session.add_breakpoint(BreakpointSpec::method("Demo", "fib"));

    run_script(&mut session, "resume\nwhere\nlist\nquit\n");

    expect![[r#"
[method-entry set] Demo#fib
[VMStart] Target VM started. Type 'help' to see commands.
[MethodEntry] Demo#fib(Demo.java:30)
#0 Demo.fib(Demo.java:30)
#1 Demo.main(Demo.java:12)
bp(method) Demo#fib
"#]]
    .assert_eq(&out.contents());
    // VM start and the filtered loopBody entry; quitting does not resume.
    assert_eq!(state.get().resumes, 2);
}

#[test]
fn step_replaces_previous_intent() {
    let target = ScriptedTarget::new().loaded_class(demo());
    let state = target.state();
    let (mut session, _out) = session_for(&target);
    session.cursor.current_thread = Some(MAIN_THREAD);

    assert_eq!(session.execute(Command::Step(StepDepth::Over)), Flow::Resume);
    assert_eq!(session.execute(Command::Step(StepDepth::Into)), Flow::Resume);

    let state = state.get();
    let live = state.active(|req| matches!(req, WatchRequest::Step { .. }));
    assert_eq!(
        live,
        [&WatchRequest::Step {
            thread: MAIN_THREAD,
            depth: StepDepth::Into
        }]
    );
    assert_eq!(session.step_requests().len(), 1);
    assert_eq!(state.created.len(), 2);
}

#[test]
fn completed_step_clears_intent() {
    let target = ScriptedTarget::new()
        .loaded_class(demo())
        .then(ScriptStep::Start)
        .then(hit(11, 4));
    let (mut session, out) = session_for(&target);

    run_script(&mut session, "step\nlocals\nquit\n");

    expect![[r#"
[VMStart] Target VM started. Type 'help' to see commands.
[Step] Demo.main(Demo.java:11)
int i = 4
"#]]
    .assert_eq(&out.contents());
    assert!(session.step_requests().is_empty());
}

#[test]
fn commands_without_current_thread_are_noops() {
    let target = ScriptedTarget::new();
    let state = target.state();
    let (mut session, out) = session_for(&target);

    assert_eq!(session.execute(Command::Where), Flow::Stay);
    assert_eq!(session.execute(Command::Print("i".into())), Flow::Stay);
    assert_eq!(session.execute(Command::Step(StepDepth::Over)), Flow::Stay);

    expect![[r#"
[no current thread: wait for a breakpoint/step]
[no current thread: wait for a breakpoint/step]
[cannot step: no suspended thread]
"#]]
    .assert_eq(&out.contents());
    assert!(state.get().created.is_empty());
}

#[test]
fn exception_policy_swap_replaces_watch() {
    let target = ScriptedTarget::new();
    let state = target.state();
    let (mut session, _out) = session_for(&target);
    let watches = || {
        state
            .get()
            .active(|req| matches!(req, WatchRequest::Exception { .. }))
            .into_iter()
            .cloned()
            .collect::<Vec<_>>()
    };

    session.set_exception_policy(ExceptionPolicy::All);
    assert_eq!(
        watches(),
        [WatchRequest::Exception {
            caught: true,
            uncaught: true
        }]
    );
    session.set_exception_policy(ExceptionPolicy::Caught);
    assert_eq!(
        watches(),
        [WatchRequest::Exception {
            caught: true,
            uncaught: false
        }]
    );
    session.set_exception_policy(ExceptionPolicy::None);
    assert!(watches().is_empty());
    assert_eq!(session.exception_policy(), ExceptionPolicy::None);
}

#[test]
fn uncaught_policy_ignores_caught_exceptions() {
    let throw = |caught| ScriptStep::Throw {
        stop: Stop::at("Demo", "main", 12).local("i", "int", Value::Int(2)),
        exception_type: "java.lang.IllegalStateException".into(),
        caught,
    };
    let target = ScriptedTarget::new()
        .loaded_class(demo())
        .then(ScriptStep::Start)
        .then(throw(true))
        .then(throw(false));
    let (mut session, out) = session_for(&target);
    session.set_exception_policy(ExceptionPolicy::Uncaught);

    run_script(&mut session, "resume\nprint i\nquit\n");

    expect![[r#"
[VMStart] Target VM started. Type 'help' to see commands.
[Exception] java.lang.IllegalStateException at Demo.main(Demo.java:12)
i = 2
"#]]
    .assert_eq(&out.contents());
}

#[test]
fn inspection_reports_missing_data() {
    let target = ScriptedTarget::new()
        .loaded_class(demo())
        .then(ScriptStep::Start)
        .then(ScriptStep::Line(Stop::at("Demo", "main", 10).without_locals()))
        .then(ScriptStep::Line(
            Stop::at("Demo", "main", 10)
                .local("name", "java.lang.String", Value::String("a\"b".into()))
                .this_field("count", Value::Int(3)),
        ));
    let (mut session, out) = session_for(&target);
    session.add_breakpoint(BreakpointSpec::line("Demo", 10));

    run_script(
        &mut session,
        "resume\nlocals\nprint i\nprint this.count\nresume\n\
         print\nprint nope\nprint name\nprint this.count\nprint this.missing\nquit\n",
    );

    expect![[r#"
[breakpoint set] Demo:10
[VMStart] Target VM started. Type 'help' to see commands.
[Breakpoint] Demo.main(Demo.java:10)
[locals unavailable: class compiled without -g:vars]
[locals unavailable: class compiled without -g:vars]
[no this]
[Breakpoint] Demo.main(Demo.java:10)
Usage: print <name|this.field>
[no such local: nope]
name = "a"b"
count = 3
[no such field]
"#]]
    .assert_eq(&out.contents());
}

#[test]
fn console_misc_commands() {
    let target = ScriptedTarget::new()
        .loaded_class(demo())
        .then(ScriptStep::Start);
    let (mut session, out) = session_for(&target);

    run_script(
        &mut session,
        "frobnicate\nbreak Demo#\nbreak Demo:10\nbreak Demo#main\nlist\nthreads\ntrace ON\ntrace maybe\ntrace off\nexit\n",
    );

    expect![[r#"
[VMStart] Target VM started. Type 'help' to see commands.
Unknown command: frobnicate (try 'help')
[error] malformed spec: invalid method breakpoint: Demo#
[breakpoint set] Demo:10
Added breakpoint: Demo:10
[method-entry set] Demo#main
Added breakpoint: Demo#main
bp Demo:10
bp(method) Demo#main
[main] id=1 state=running suspended=true
trace=true
trace=true
trace=false
"#]]
    .assert_eq(&out.contents());
}

#[test]
fn help_lists_commands() {
    let target = ScriptedTarget::new();
    let (mut session, out) = session_for(&target);

    session.execute(Command::Help);

    assert_eq!(out.contents(), format!("{HELP}\n", HELP = crate::console::HELP));
}

#[test]
fn quit_skips_rest_of_batch_and_resume() {
    let location = CodeLocation::new("Demo", "main", Some("Demo.java"), Some(10));
    let breakpoint = |id| TargetEvent::Breakpoint {
        request: RequestId::new(RequestKind::Breakpoint, id),
        thread: MAIN_THREAD,
        location: location.clone(),
    };
    let target = ScriptedTarget::new().then(ScriptStep::Batch(EventBatch {
        suspend_policy: SuspendPolicy::All,
        events: vec![breakpoint(1), breakpoint(2)],
    }));
    let state = target.state();
    let (mut session, out) = session_for(&target);

    run_script(&mut session, "quit\n");

    expect![[r#"
[Breakpoint] Demo.main(Demo.java:10)
"#]]
    .assert_eq(&out.contents());
    let state = state.get();
    assert_eq!(state.resumes, 0);
    assert_eq!(state.disposed, 1);
}

#[test]
fn end_of_input_quits_and_disposes_once() {
    let target = ScriptedTarget::new()
        .then(ScriptStep::Start)
        .then(ScriptStep::Disconnect);
    let state = target.state();
    let (mut session, _out) = session_for(&target);

    run_script(&mut session, "");
    assert!(session.cursor().quit);
    drop(session);

    let state = state.get();
    assert_eq!(state.resumes, 0);
    assert_eq!(state.disposed, 1);
}

#[test]
fn disconnect_reports_exit() {
    let target = ScriptedTarget::new()
        .then(ScriptStep::Start)
        .then(ScriptStep::Disconnect);
    let (mut session, out) = session_for(&target);

    run_script(&mut session, "resume\n");

    expect![[r#"
[VMStart] Target VM started. Type 'help' to see commands.
[VMExit] Target VM exited.
"#]]
    .assert_eq(&out.contents());
}

#[test]
fn rejected_resume_keeps_draining() {
    let target = ScriptedTarget::new()
        .loaded_class(demo())
        .rejecting_resume()
        .then(ScriptStep::Start)
        .then(hit(10, 0));
    let state = target.state();
    let (mut session, out) = session_for(&target);
    session.add_breakpoint(BreakpointSpec::line("Demo", 10));

    run_script(&mut session, "resume\nresume\n");

    expect![[r#"
[breakpoint set] Demo:10
[VMStart] Target VM started. Type 'help' to see commands.
[Breakpoint] Demo.main(Demo.java:10)
[VMExit] Target VM exited.
"#]]
    .assert_eq(&out.contents());
    assert_eq!(session.cursor().current_batch, Some(SuspendPolicy::None));
    let state = state.get();
    assert_eq!(state.resumes, 2);
    assert_eq!(state.redundant_resumes, 0);
    assert_eq!(state.disposed, 1);
}
