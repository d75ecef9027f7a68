//! Handling of default response to requests

use crate::cluster_library::ClusterLibraryStatus;
use crate::pack::Pack;
use crate::Error;

/// Default response for request
#[derive(Clone, Debug, PartialEq)]
pub struct DefaultResponse {
    /// Command identifier from the request
    pub command: u8,
    /// Return status of the request
    pub status: ClusterLibraryStatus,
}

impl Pack<DefaultResponse, Error> for DefaultResponse {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        if data.len() < 2 {
            return Err(Error::NotEnoughSpace);
        }
        data[0] = self.command;
        data[1] = u8::from(self.status);
        Ok(2)
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        if data.len() < 2 {
            return Err(Error::WrongNumberOfBytes);
        }
        Ok((
            Self {
                command: data[0],
                status: ClusterLibraryStatus::from_u8_lossy(data[1]),
            },
            2,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpack_default_response() {
        let (response, used) = DefaultResponse::unpack(&[0x02, 0x81]).unwrap();
        assert_eq!(used, 2);
        assert_eq!(response.command, 0x02);
        assert_eq!(response.status, ClusterLibraryStatus::UnsupportedClusterCommand);
        assert_eq!(DefaultResponse::unpack(&[0x02]), Err(Error::WrongNumberOfBytes));
    }
}
