/*
 * Copyright (C) 2015-2023 IoT.bzh Company
 * Author: Fulup Ar Foll <fulup@iot.bzh>
 *
 * Redpesk interface code/config use MIT License and can be freely copy/modified even within proprietary code
 * License: $RP_BEGIN_LICENSE$ SPDX:MIT https://opensource.org/licenses/MIT $RP_END_LICENSE$
 *
*/

#![doc(
    html_logo_url = "https://iot.bzh/images/defaults/company/512-479-max-transp.png",
    html_favicon_url = "https://iot.bzh/images/defaults/favicon.ico"
)]
extern crate bitflags;

#[cfg(feature = "serde")]
extern crate serde;

#[path = "./utils-mod.rs"]
mod utils;

#[path = "./frame-mod.rs"]
mod frame;

#[path = "./string-mod.rs"]
mod string;

#[path = "./filter-mod.rs"]
mod filter;

#[path = "./dispatch-mod.rs"]
mod dispatch;

#[path = "./driver-mod.rs"]
mod driver;

pub mod prelude {
    pub use crate::dispatch::*;
    pub use crate::driver::*;
    pub use crate::filter::*;
    pub use crate::frame::*;
    pub use crate::string::*;
    pub use crate::utils::*;
}
