//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements         | Connects to                     |
//! |---------------|--------------------|---------------------------------|
//! | `gpio_relay`  | RelayPort          | `embedded-hal` output pin       |
//! | `health`      | EventSink          | Liveness monitor                |
//! | `log_sink`    | EventSink          | `log` facade                    |
//! | `shared_goal` | GoalSource         | In-process mutable goal         |
//! | `simulated`   | TemperatureSensor  | Thermal model (mock hardware)   |
//! |               | OutputPin          |                                 |
//! | `store`       | GoalSource         | JSON state file                 |

pub mod gpio_relay;
pub mod health;
pub mod log_sink;
pub mod shared_goal;
pub mod simulated;
pub mod store;
