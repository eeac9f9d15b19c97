//! The purpose of this module is to alleviate the need to import many of the
//! `adcast` types.
//!
//! ```
//! # #![allow(unused_imports)]
//! use adcast::prelude::*;
//! ```
pub use crate::advert::{AdvertError, AdvertService};
pub use crate::clock::{Clock, SystemClock};
pub use crate::delivery::{Delivery, DeliveryError};
pub use crate::job::{AdvertId, ChatId, Job};
pub use crate::recurrence::Recurrence;
pub use crate::registry::JobRegistry;
pub use crate::scheduler::{Scheduler, SchedulerLoop};
pub use crate::session::{Command, SessionManager};
pub use crate::store::{AdvertRecord, AdvertStore, NewAdvert};
pub use crate::{Adcast, AdcastHandle};
