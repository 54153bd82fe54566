//! Serializes an object whose untyped `reference` field points back at itself.
//!
//! Without the guard this would recurse until the stack overflows. With it, the call returns
//! a `CycleError` naming the type and the path.
//!
//! Run with `cargo run --example circular_reference`.

use std::cell::RefCell;
use std::rc::Rc;

use cycleguard::{CycleGuard, GraphObject, Inspector};

#[derive(GraphObject)]
struct CircularObject {
    reference: Option<Rc<RefCell<dyn GraphObject>>>,
}

#[derive(GraphObject)]
struct Payload {
    note: String,
}

fn main() -> cycleguard::Result<()> {
    let circular = Rc::new(RefCell::new(CircularObject { reference: None }));

    // Pointing at another record is fine.
    let payload: Rc<RefCell<dyn GraphObject>> = Rc::new(RefCell::new(Payload {
        note: "hello".into(),
    }));
    circular.borrow_mut().reference = Some(payload);
    let bytes = CycleGuard::to_bytes(&*circular.borrow())?;
    println!("{}", Inspector::from_bytes(&bytes)?);

    // Pointing at itself is a cycle.
    let erased: Rc<RefCell<dyn GraphObject>> = circular.clone();
    circular.borrow_mut().reference = Some(erased);
    match CycleGuard::to_bytes(&*circular.borrow()) {
        Ok(bytes) => println!("unexpected success: {} bytes", bytes.len()),
        Err(e) => println!("rejected: {e}"),
    }

    circular.borrow_mut().reference = None;
    Ok(())
}
