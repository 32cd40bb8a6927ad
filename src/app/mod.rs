// Application layer: a small module set wired through the container, used by the binary.

pub mod greeter;
