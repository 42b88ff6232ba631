//! The default value policy: adopt tasks, pass everything else through.

use super::continuation::Continuation;
use super::handlers::Step;
use crate::task::Task;
use crate::value::Value;

pub(crate) fn adopt_tasks(k: Continuation, step: Step) {
    match step {
        Step::Yielded(value) => match value.downcast::<Task<Value, Value>>() {
            Ok(task) => k.adopt(task),
            Err(value) => k.resume(value),
        },
        Step::Returned(value) => match value.downcast::<Task<Value, Value>>() {
            Ok(task) => {
                let end = k.clone();
                k.adopt_with(task, move |value| end.end(value));
            }
            Err(value) => k.end(value),
        },
    }
}
