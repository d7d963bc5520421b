// Copyright (C) 2013-2020 Blockstack PBC, a public benefit corporation
// Copyright (C) 2020-2024 Stacks Open Internet Foundation
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;

use regex::Regex;

use crate::errors::ClarityTypeError;

pub const MAX_STRING_LEN: u8 = 128;
pub const CONTRACT_MIN_NAME_LENGTH: usize = 1;
pub const CONTRACT_MAX_NAME_LENGTH: usize = 40;

lazy_static! {
    pub static ref CLARITY_NAME_REGEX_STRING: String =
        "^[a-zA-Z]([a-zA-Z0-9]|[-_!?+<>=/*])*$|^[-+=/*]$|^[<>]=?$".into();
    pub static ref CONTRACT_NAME_REGEX_STRING: String = format!(
        r#"^[a-zA-Z]([a-zA-Z0-9]|[-_]){{{},{}}}$|^__transient$"#,
        CONTRACT_MIN_NAME_LENGTH - 1,
        CONTRACT_MAX_NAME_LENGTH - 1
    );
    pub static ref CLARITY_NAME_REGEX: Option<Regex> =
        Regex::new(CLARITY_NAME_REGEX_STRING.as_str()).ok();
    pub static ref CONTRACT_NAME_REGEX: Option<Regex> =
        Regex::new(CONTRACT_NAME_REGEX_STRING.as_str()).ok();
}

fn regex_matches(regex: &Option<Regex>, value: &str) -> bool {
    regex.as_ref().map(|r| r.is_match(value)).unwrap_or(false)
}

/// A string newtype that can only be built from values accepted by its grammar
macro_rules! guarded_string {
    ($Name:ident, $Regex:expr, $ErrorVariant:path) => {
        #[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $Name(String);

        impl TryFrom<String> for $Name {
            type Error = ClarityTypeError;
            fn try_from(value: String) -> Result<Self, Self::Error> {
                if value.len() > (MAX_STRING_LEN as usize) || !regex_matches(&$Regex, &value) {
                    return Err($ErrorVariant(value));
                }
                Ok(Self(value))
            }
        }

        impl TryFrom<&str> for $Name {
            type Error = ClarityTypeError;
            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::try_from(value.to_string())
            }
        }

        impl $Name {
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Byte length; never more than `MAX_STRING_LEN`
            pub fn len(&self) -> u8 {
                self.0.len() as u8
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl Deref for $Name {
            type Target = str;
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl Borrow<str> for $Name {
            fn borrow(&self) -> &str {
                self.as_str()
            }
        }

        impl From<$Name> for String {
            fn from(name: $Name) -> String {
                name.0
            }
        }

        impl fmt::Display for $Name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

guarded_string!(
    ClarityName,
    CLARITY_NAME_REGEX,
    ClarityTypeError::InvalidClarityName
);
guarded_string!(
    ContractName,
    CONTRACT_NAME_REGEX,
    ClarityTypeError::InvalidContractName
);
