//! Camera groups

use serde::{Deserialize, Serialize};

use super::int_bool;

/// Camera information (`CameraInfo`)
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
#[serde(default)]
pub struct CameraInfo {
    pub groups: Vec<CameraGroup>,
}

impl CameraInfo {
    /// Look up a group by name, e.g. `"TV1"`.
    pub fn group(&self, name: &str) -> Option<&CameraGroup> {
        self.groups.iter().find(|g| g.group_name == name)
    }
}

/// Camera group
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
#[serde(default)]
pub struct CameraGroup {
    pub group_num: i32,
    pub group_name: String,
    /// Older builds spell this key `IsSenic`
    #[serde(rename = "IsScenic", alias = "IsSenic", deserialize_with = "int_bool")]
    pub is_scenic: bool,
    pub cameras: Vec<Camera>,
}

/// Individual camera
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
#[serde(default)]
pub struct Camera {
    pub camera_num: i32,
    pub camera_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_by_name() -> anyhow::Result<()> {
        let yaml = "Groups:\n - GroupNum: 1\n   GroupName: Nose\n   Cameras:\n   - CameraNum: 1\n     CameraName: CamNose\n - GroupNum: 10\n   GroupName: Scenic\n   IsScenic: true\n - GroupNum: 11\n   GroupName: Blimp\n   IsSenic: 1\n";
        let info: CameraInfo = serde_yaml_ng::from_str(yaml)?;
        assert_eq!(info.groups.len(), 3);
        assert_eq!(info.group("Nose").map(|g| g.cameras.len()), Some(1));
        assert_eq!(info.group("Scenic").map(|g| g.is_scenic), Some(true));
        assert_eq!(info.group("Blimp").map(|g| g.is_scenic), Some(true));
        assert!(info.group("Pit Lane").is_none());
        Ok(())
    }
}
