#![cfg(test)]

use std::sync::{Arc, Mutex as StdMutex};

use crate::plugin_system::plugin::{HookError, HookKind, HookResult, Plugin};

/// Records hook calls as `<plugin>.<hook symbol>`
pub type Tracker = Arc<StdMutex<Vec<String>>>;

pub fn tracker() -> Tracker {
    Arc::new(StdMutex::new(Vec::new()))
}

pub fn calls(tracker: &Tracker) -> Vec<String> {
    tracker.lock().unwrap().clone()
}

/// Calls recorded for one hook, in order
pub fn calls_of(tracker: &Tracker, kind: HookKind) -> Vec<String> {
    let suffix = format!(".{}", kind);
    calls(tracker).into_iter().filter(|call| call.ends_with(&suffix)).collect()
}

fn recorder(name: &str, kind: HookKind, tracker: &Tracker, failing: &[HookKind]) -> impl Fn() -> HookResult + Send + Sync + 'static {
    let entry = format!("{}.{}", name, kind);
    let tracker = tracker.clone();
    let fail = failing.contains(&kind);
    move || {
        tracker.lock().unwrap().push(entry.clone());
        if fail {
            Err(HookError::msg(format!("{} refused", entry)))
        } else {
            Ok(())
        }
    }
}

/// Plugin implementing all eight hooks, recording each call and failing the
/// hooks listed in `failing`
pub fn tracked_plugin(name: &str, tracker: &Tracker, failing: &[HookKind]) -> Plugin {
    let init = recorder(name, HookKind::Init, tracker, failing);
    let start = recorder(name, HookKind::Start, tracker, failing);
    let exit = recorder(name, HookKind::Exit, tracker, failing);
    let reset = recorder(name, HookKind::Reset, tracker, failing);
    let begin = recorder(name, HookKind::Begin, tracker, failing);
    let complete = recorder(name, HookKind::Complete, tracker, failing);
    let end = recorder(name, HookKind::End, tracker, failing);
    let abort = recorder(name, HookKind::Abort, tracker, failing);

    Plugin::builder(name)
        .on_init(move |_, _| init())
        .on_start(move |_, _| start())
        .on_exit(move |_| exit())
        .on_reset(move |_| reset())
        .on_begin(move |_, _| begin())
        .on_complete(move |_, _| complete())
        .on_end(move |_, _| end())
        .on_abort(move |_, _| abort())
        .build()
}
