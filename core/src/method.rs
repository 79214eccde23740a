//! The table of named service operations.
//!
//! This is a lookup table, not a validator: the core never checks caller
//! parameters against an operation's declared schema. An unknown or
//! malformed parameter is only caught server-side.

/// A named operation exposed by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    TestEcho,
    TestLogin,
    AuthGetFrob,
    AuthGetToken,
    AuthCheckToken,
    ContactsAdd,
    ContactsDelete,
    ContactsGetList,
    GroupsAdd,
    GroupsAddContact,
    GroupsDelete,
    GroupsGetList,
    GroupsRemoveContact,
    ListsAdd,
    ListsArchive,
    ListsDelete,
    ListsGetList,
    ListsSetDefault,
    ListsSetName,
    ListsUnarchive,
    LocationsGetList,
    ReflectionGetMethodInfo,
    ReflectionGetMethods,
    SettingsGetList,
    TasksAdd,
    TasksAddTags,
    TasksComplete,
    TasksDelete,
    TasksGetList,
    TasksMovePriority,
    TasksMoveTo,
    TasksNotesAdd,
    TasksNotesDelete,
    TasksNotesEdit,
    TasksPostpone,
    TasksRemoveTags,
    TasksSetDueDate,
    TasksSetEstimate,
    TasksSetLocation,
    TasksSetName,
    TasksSetPriority,
    TasksSetRecurrence,
    TasksSetTags,
    TasksSetUrl,
    TasksUncomplete,
    TimeConvert,
    TimeParse,
    TimelinesCreate,
    TimezonesGetList,
}

impl Method {
    /// The operation name as it appears in the `method` query parameter.
    pub fn wire_name(self) -> &'static str {
        match self {
            Method::TestEcho => "rtm.test.echo",
            Method::TestLogin => "rtm.test.login",
            Method::AuthGetFrob => "rtm.auth.getFrob",
            Method::AuthGetToken => "rtm.auth.getToken",
            Method::AuthCheckToken => "rtm.auth.checkToken",
            Method::ContactsAdd => "rtm.contacts.add",
            Method::ContactsDelete => "rtm.contacts.delete",
            Method::ContactsGetList => "rtm.contacts.getList",
            Method::GroupsAdd => "rtm.groups.add",
            Method::GroupsAddContact => "rtm.groups.addContact",
            Method::GroupsDelete => "rtm.groups.delete",
            Method::GroupsGetList => "rtm.groups.getList",
            Method::GroupsRemoveContact => "rtm.groups.removeContact",
            Method::ListsAdd => "rtm.lists.add",
            Method::ListsArchive => "rtm.lists.archive",
            Method::ListsDelete => "rtm.lists.delete",
            Method::ListsGetList => "rtm.lists.getList",
            Method::ListsSetDefault => "rtm.lists.setDefaultList",
            Method::ListsSetName => "rtm.lists.setName",
            Method::ListsUnarchive => "rtm.lists.unarchive",
            Method::LocationsGetList => "rtm.locations.getList",
            Method::ReflectionGetMethodInfo => "rtm.reflection.getMethodInfo",
            Method::ReflectionGetMethods => "rtm.reflection.getMethods",
            Method::SettingsGetList => "rtm.settings.getList",
            Method::TasksAdd => "rtm.tasks.add",
            Method::TasksAddTags => "rtm.tasks.addTags",
            Method::TasksComplete => "rtm.tasks.complete",
            Method::TasksDelete => "rtm.tasks.delete",
            Method::TasksGetList => "rtm.tasks.getList",
            Method::TasksMovePriority => "rtm.tasks.movePriority",
            Method::TasksMoveTo => "rtm.tasks.moveTo",
            Method::TasksNotesAdd => "rtm.tasks.notes.add",
            Method::TasksNotesDelete => "rtm.tasks.notes.delete",
            Method::TasksNotesEdit => "rtm.tasks.notes.edit",
            Method::TasksPostpone => "rtm.tasks.postpone",
            Method::TasksRemoveTags => "rtm.tasks.removeTags",
            Method::TasksSetDueDate => "rtm.tasks.setDueDate",
            Method::TasksSetEstimate => "rtm.tasks.setEstimate",
            Method::TasksSetLocation => "rtm.tasks.setLocation",
            Method::TasksSetName => "rtm.tasks.setName",
            Method::TasksSetPriority => "rtm.tasks.setPriority",
            Method::TasksSetRecurrence => "rtm.tasks.setRecurrence",
            Method::TasksSetTags => "rtm.tasks.setTags",
            Method::TasksSetUrl => "rtm.tasks.setURL",
            Method::TasksUncomplete => "rtm.tasks.uncomplete",
            Method::TimeConvert => "rtm.time.convert",
            Method::TimeParse => "rtm.time.parse",
            Method::TimelinesCreate => "rtm.timelines.create",
            Method::TimezonesGetList => "rtm.timezones.getList",
        }
    }

    /// Whether the operation acts on user data and therefore needs a token.
    pub fn requires_auth(self) -> bool {
        !matches!(
            self,
            Method::TestEcho
                | Method::AuthGetFrob
                | Method::AuthGetToken
                | Method::AuthCheckToken
                | Method::TimeConvert
                | Method::TimeParse
                | Method::ReflectionGetMethods
                | Method::ReflectionGetMethodInfo
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_use_the_service_namespace() {
        assert_eq!(Method::TasksGetList.wire_name(), "rtm.tasks.getList");
        assert_eq!(Method::AuthGetFrob.wire_name(), "rtm.auth.getFrob");
        assert_eq!(Method::TasksSetUrl.wire_name(), "rtm.tasks.setURL");
        assert_eq!(Method::TasksNotesAdd.wire_name(), "rtm.tasks.notes.add");
    }

    #[test]
    fn stateless_operations_do_not_require_auth() {
        assert!(!Method::TimeConvert.requires_auth());
        assert!(!Method::ReflectionGetMethods.requires_auth());
        assert!(!Method::AuthGetFrob.requires_auth());
        assert!(Method::TasksGetList.requires_auth());
        assert!(Method::TestLogin.requires_auth());
    }
}
