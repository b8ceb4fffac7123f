//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter    | Implements            | Connects to                   |
//! |------------|-----------------------|-------------------------------|
//! | `hardware` | OutputLine, PwmLine   | any `embedded-hal` pin / PWM  |
//! | `loopback` | CloudTransport        | in-process queue              |
//! | `uplink`   | Uplink                | a CloudTransport              |
//! | `time`     | Sleeper               | `std::thread::sleep`          |

pub mod hardware;
pub mod loopback;
pub mod time;
pub mod uplink;
