use std::fmt;
use std::str::FromStr;

/// OBIS code in the `A-B:C.D.E` notation used on P1 ports,
/// optionally followed by a storage group `*F` or `.F`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObisCode {
    /// Medium (0=abstract, 1=electricity, 6=heat, 7=gas, 8=water)
    pub a: u8,
    /// Channel, the M-Bus slot for sub-meters
    pub b: u8,
    /// Physical value
    pub c: u8,
    /// Processing method
    pub d: u8,
    /// Tariff or time
    pub e: u8,
    /// Storage, rarely sent by P1 meters
    pub f: Option<u8>,
}

impl FromStr for ObisCode {
    type Err = ();

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        let (ab, cdef) = code.split_once(':').ok_or(())?;
        let (a, b) = ab.split_once('-').ok_or(())?;

        let (cde, f) = match cdef.split_once('*') {
            Some((cde, f)) => (cde, Some(f)),
            None => (cdef, None),
        };

        let mut parts = cde.split('.');
        let c = parts.next().ok_or(())?;
        let d = parts.next().ok_or(())?;
        let e = parts.next().ok_or(())?;
        /* The storage group may also be written as a fourth dotted part */
        let f = match (f, parts.next()) {
            (Some(_), Some(_)) => return Err(()),
            (Some(f), None) | (None, Some(f)) => Some(f),
            (None, None) => None,
        };
        if parts.next().is_some() {
            return Err(());
        }

        let num = |s: &str| s.parse::<u8>().map_err(|_| ());
        return Ok(ObisCode {
            a: num(a)?,
            b: num(b)?,
            c: num(c)?,
            d: num(d)?,
            e: num(e)?,
            f: match f {
                Some(f) => Some(num(f)?),
                None => None,
            },
        });
    }
}

impl fmt::Display for ObisCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}:{}.{}.{}", self.a, self.b, self.c, self.d, self.e)?;
        if let Some(storage) = self.f {
            write!(f, "*{}", storage)?;
        }
        Ok(())
    }
}

pub fn validate_obis_code(code: &str) -> bool {
    code.parse::<ObisCode>().is_ok()
}

/// Removes whitespace some meters put around or inside the identifier
pub fn normalize_obis_code(code: &str) -> String {
    code.chars().filter(|c| !c.is_whitespace()).collect()
}
