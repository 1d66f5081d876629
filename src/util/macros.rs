macro_rules! impl_str_enums {
    ($(#[$meta:meta])* $tname:ident, $($vname:ident = $val:literal,)+) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $tname {
            $(
                $vname,
             )+
        }

        impl $tname {
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(
                        $tname::$vname => $val,
                     )+
                }
            }
        }

        impl std::str::FromStr for $tname {
            type Err = $crate::Error;

            fn from_str(val: &str) -> Result<Self, Self::Err> {
                Ok(match val {
                    $(
                        $val => $tname::$vname,
                     )+
                    other => return Err($crate::Error::InvalidData(format!("unexpected value {} for {}", other, stringify!($tname)).into())),
                })
            }
        }

        impl std::fmt::Display for $tname {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl serde::Serialize for $tname {
            fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
                s.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $tname {
            fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
                let raw = <String as serde::Deserialize>::deserialize(d)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

pub(crate) use impl_str_enums;
